//! Serde adapter for sample and timestamp vectors.
//!
//! JSON has no NaN or infinity, and `serde_json` writes them as `null`, which
//! then fails to read back as a float. Acquisition dropouts are routinely NaN,
//! so non-finite values are written as the strings `"NaN"`, `"inf"` and
//! `"-inf"`. `null` reads back as NaN so older documents still load.
//!
//! ```ignore
//! #[serde(with = "super::samples")]
//! pub samples: Vec<f32>,
//! ```

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const NAN: &str = "NaN";
const INFINITY: &str = "inf";
const NEG_INFINITY: &str = "-inf";

/// Floating-point sample types the adapter handles.
pub trait Sample: Copy + Serialize + DeserializeOwned {
    fn is_finite(self) -> bool;
    fn is_nan(self) -> bool;
    fn is_sign_positive(self) -> bool;
    fn from_marker(marker: &str) -> Option<Self>;
}

macro_rules! impl_sample {
    ($t:ty) => {
        impl Sample for $t {
            fn is_finite(self) -> bool { <$t>::is_finite(self) }
            fn is_nan(self) -> bool { <$t>::is_nan(self) }
            fn is_sign_positive(self) -> bool { <$t>::is_sign_positive(self) }

            fn from_marker(marker: &str) -> Option<Self> {
                match marker {
                    NAN => Some(<$t>::NAN),
                    INFINITY => Some(<$t>::INFINITY),
                    NEG_INFINITY => Some(<$t>::NEG_INFINITY),
                    _ => None,
                }
            }
        }
    };
}

impl_sample!(f32);
impl_sample!(f64);

fn marker<F: Sample>(value: F) -> Option<&'static str> {
    if value.is_finite() {
        None
    } else if value.is_nan() {
        Some(NAN)
    } else if value.is_sign_positive() {
        Some(INFINITY)
    } else {
        Some(NEG_INFINITY)
    }
}

pub fn serialize<S, F>(values: &[F], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    F: Sample,
{
    let mut seq = serializer.serialize_seq(Some(values.len()))?;
    for &value in values {
        match marker(value) {
            Some(m) => seq.serialize_element(m)?,
            None => seq.serialize_element(&value)?,
        }
    }
    seq.end()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Cell<F> {
    Number(F),
    Marker(String),
    Missing(()),
}

pub fn deserialize<'de, D, F>(deserializer: D) -> Result<Vec<F>, D::Error>
where
    D: Deserializer<'de>,
    F: Sample,
{
    let cells: Vec<Cell<F>> = Vec::deserialize(deserializer)?;
    cells
        .into_iter()
        .map(|cell| match cell {
            Cell::Number(v) => Ok(v),
            Cell::Marker(m) => F::from_marker(&m)
                .ok_or_else(|| D::Error::custom(format!("unknown sample marker {m:?}"))),
            Cell::Missing(()) => F::from_marker(NAN).ok_or_else(|| D::Error::custom("no NaN marker")),
        })
        .collect()
}
