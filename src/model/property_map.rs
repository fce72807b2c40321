//! AnnotationMap: the key-value store on sites, stimuli and epochs.

use std::collections::BTreeMap;
use super::Value;

/// A map of annotation names to values.
///
/// Ordered so exports and debug output are reproducible run to run.
pub type AnnotationMap = BTreeMap<String, Value>;

/// Collect (key, value) pairs into an `AnnotationMap`. Later keys overwrite earlier ones.
pub fn annotations<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> AnnotationMap
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
