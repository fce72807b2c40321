//! # Stimulus records and catalog
//!
//! A stimulus is a bag of annotations keyed by its presentation number. Rows
//! come from a tab-delimited protocol file ([`protocol`]); the pipeline only
//! ever sees them through the [`StimulusCatalog`] lookup contract.

pub mod catalog;
pub mod protocol;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::{AnnotationMap, Value};

pub use catalog::{MemoryCatalog, StimulusCatalog};
pub use protocol::{DEFAULT_PROTOCOL_COLUMNS, parse_protocol, read_protocol_file};

static PARAMETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w+)\s*=\s*(\w+)").expect("parameter pattern"));

/// Annotation key holding values past the declared columns.
pub const ADDITIONAL_PARAMETERS: &str = "additional_parameters";
/// Annotation key whose text is expanded into `key=value` pairs.
pub const PARAMETERS: &str = "parameters";

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    pub annotations: AnnotationMap,
}

impl Stimulus {
    /// Build a record from declared column names and one row of raw cells.
    ///
    /// - names are lower-cased
    /// - `na`/`unused` cells become `Value::Null`, numeric cells become `Value::Float`
    /// - cells past the declared names land in `additional_parameters`
    /// - a `parameters` cell is expanded into a nested map and its pairs are
    ///   also merged into the top level, overwriting same-named keys
    pub fn from_row<P, V>(params: &[P], values: &[V]) -> Self
    where
        P: AsRef<str>,
        V: AsRef<str>,
    {
        let names: Vec<String> = params.iter().map(|p| p.as_ref().to_lowercase()).collect();
        let cells: Vec<Value> = values.iter().map(|v| Value::from_cell(v.as_ref())).collect();

        let mut annotations: AnnotationMap = names.iter().cloned().zip(cells.iter().cloned()).collect();

        if cells.len() > names.len() {
            annotations.insert(
                ADDITIONAL_PARAMETERS.to_owned(),
                Value::List(cells[names.len()..].to_vec()),
            );
        }

        if names.iter().any(|n| n == PARAMETERS) {
            let pairs = match annotations.get(PARAMETERS) {
                Some(Value::String(text)) => parse_parameters(text),
                _ => AnnotationMap::new(),
            };
            for (k, v) in &pairs {
                annotations.insert(k.clone(), v.clone());
            }
            annotations.insert(PARAMETERS.to_owned(), Value::Map(pairs));
        }

        Self { annotations }
    }

    /// The presentation number, when present and numeric.
    pub fn number(&self) -> Option<f64> {
        self.annotations.get("number").and_then(Value::as_float)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.annotations.get(key)
    }

    /// Expanded `parameters` pairs, empty when the column was absent or unused.
    pub fn parameters(&self) -> Option<&std::collections::BTreeMap<String, Value>> {
        self.annotations.get(PARAMETERS).and_then(Value::as_map)
    }
}

/// Scan free text for `key=value` pairs. Values stay text; unused markers become `Null`.
pub fn parse_parameters(text: &str) -> AnnotationMap {
    PARAMETER
        .captures_iter(text)
        .map(|c| (c[1].to_owned(), Value::sentinel_or_text(&c[2])))
        .collect()
}
