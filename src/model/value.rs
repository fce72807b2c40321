//! Annotation value type.
//!
//! Annotations arrive from free-text sources (protocol files, segment names,
//! the stimulus catalog) with no fixed schema, so every annotation slot holds
//! one of these tagged variants.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single annotation value.
///
/// - `Null` is the "none"/"unused" sentinel; it displays as `none`
/// - Scalars: Int, Float, String
/// - Containers: List, Map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NONE",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::List(_) => "LIST",
            Value::Map(_) => "MAP",
        }
    }

    pub fn is_null(&self) -> bool { matches!(self, Value::Null) }
    pub fn is_numeric(&self) -> bool { matches!(self, Value::Int(_) | Value::Float(_)) }

    /// Attempt to extract as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Attempt to extract as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Normalize a raw text cell: `na`/`unused` (any case) become `Null`,
    /// everything else is kept as a string.
    pub fn sentinel_or_text(raw: &str) -> Value {
        if is_unused_marker(raw) {
            Value::Null
        } else {
            Value::String(raw.to_owned())
        }
    }

    /// Normalize a raw text cell, then promote it to `Float` when it parses.
    pub fn from_cell(raw: &str) -> Value {
        if is_unused_marker(raw) {
            return Value::Null;
        }
        match raw.trim().parse::<f64>() {
            Ok(f) => Value::Float(f),
            Err(_) => Value::String(raw.to_owned()),
        }
    }
}

fn is_unused_marker(raw: &str) -> bool {
    raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("unused")
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<u32> for Value { fn from(v: u32) -> Self { Value::Int(v as i64) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self { Value::List(v.into_iter().map(Into::into).collect()) }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "none"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(42), Value::Int(42));
        assert_eq!(Value::from(3.5), Value::Float(3.5));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_unused_markers_become_null() {
        assert_eq!(Value::from_cell("NA"), Value::Null);
        assert_eq!(Value::from_cell("Unused"), Value::Null);
        assert_eq!(Value::sentinel_or_text("na"), Value::Null);
        assert_eq!(Value::from_cell("nan-ish"), Value::String("nan-ish".into()));
    }

    #[test]
    fn test_numeric_cells_promote_to_float() {
        assert_eq!(Value::from_cell("5"), Value::Float(5.0));
        assert_eq!(Value::from_cell(" 2.5 "), Value::Float(2.5));
        assert_eq!(Value::sentinel_or_text("200"), Value::String("200".into()));
    }

    #[test]
    fn test_null_displays_as_none() {
        assert_eq!(Value::Null.to_string(), "none");
        assert_eq!(Value::from(vec![1, 2]).to_string(), "[1, 2]");
    }
}
