//! Stimulus catalog lookup.

use hashbrown::HashMap;

use super::Stimulus;
use crate::model::CatalogId;

/// Resolves a played stimulus number to its durable catalog identity.
///
/// Lookups are synchronous; whatever backs the catalog must be loaded before
/// an import run starts.
pub trait StimulusCatalog {
    fn lookup(&self, number: f64) -> Option<CatalogId>;
}

impl<F> StimulusCatalog for F
where
    F: Fn(f64) -> Option<CatalogId>,
{
    fn lookup(&self, number: f64) -> Option<CatalogId> {
        self(number)
    }
}

/// Float keys compare by bit pattern, with `-0.0` folded onto `0.0`.
fn number_key(number: f64) -> u64 {
    if number == 0.0 { 0.0f64.to_bits() } else { number.to_bits() }
}

/// In-memory catalog. Ids are handed out from 1 in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: Vec<Stimulus>,
    by_number: HashMap<u64, usize>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stimulus under its `number` annotation.
    ///
    /// Returns `None` when the stimulus has no numeric `number`.
    pub fn insert(&mut self, stimulus: Stimulus) -> Option<CatalogId> {
        let number = stimulus.number()?;
        Some(self.insert_as(number, stimulus))
    }

    /// Add a stimulus under an explicit presentation number.
    ///
    /// A later entry with the same number replaces the earlier one and keeps its id.
    pub fn insert_as(&mut self, number: f64, stimulus: Stimulus) -> CatalogId {
        let key = number_key(number);
        if let Some(&pos) = self.by_number.get(&key) {
            tracing::warn!(number, "replacing catalog entry with duplicate stimulus number");
            self.entries[pos] = stimulus;
            return CatalogId(pos as u64 + 1);
        }
        self.entries.push(stimulus);
        let pos = self.entries.len() - 1;
        self.by_number.insert(key, pos);
        CatalogId(pos as u64 + 1)
    }

    pub fn get(&self, id: CatalogId) -> Option<&Stimulus> {
        let pos = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.entries.get(pos)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CatalogId, &Stimulus)> {
        self.entries.iter().enumerate().map(|(i, s)| (CatalogId(i as u64 + 1), s))
    }
}

impl FromIterator<Stimulus> for MemoryCatalog {
    fn from_iter<I: IntoIterator<Item = Stimulus>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for stimulus in iter {
            if catalog.insert(stimulus).is_none() {
                tracing::warn!("skipping stimulus without a numeric number");
            }
        }
        catalog
    }
}

impl StimulusCatalog for MemoryCatalog {
    fn lookup(&self, number: f64) -> Option<CatalogId> {
        self.by_number.get(&number_key(number)).map(|&pos| CatalogId(pos as u64 + 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stim(number: &str, wav: &str) -> Stimulus {
        Stimulus::from_row(&["number", "tdt_wavefile"], &[number, wav])
    }

    #[test]
    fn test_lookup_by_number() {
        let catalog: MemoryCatalog = [stim("5", "a.wav"), stim("7", "b.wav")].into_iter().collect();
        assert_eq!(catalog.lookup(5.0), Some(CatalogId(1)));
        assert_eq!(catalog.lookup(7.0), Some(CatalogId(2)));
        assert_eq!(catalog.lookup(6.0), None);
        assert_eq!(catalog.lookup(f64::NAN), None);
    }

    #[test]
    fn test_duplicate_number_replaces_entry() {
        let mut catalog = MemoryCatalog::new();
        catalog.insert(stim("5", "a.wav"));
        let id = catalog.insert(stim("5", "b.wav")).unwrap();
        assert_eq!(id, CatalogId(1));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(id).unwrap().get("tdt_wavefile").unwrap().as_str(), Some("b.wav"));
    }

    #[test]
    fn test_non_numeric_number_is_rejected() {
        let mut catalog = MemoryCatalog::new();
        assert_eq!(catalog.insert(stim("five", "a.wav")), None);
        assert!(catalog.is_empty());
        assert!(catalog.get(CatalogId(0)).is_none());
    }

    #[test]
    fn test_insert_as_ignores_annotations() {
        let mut catalog = MemoryCatalog::new();
        let id = catalog.insert_as(3.0, Stimulus::from_row(&["id"], &["3"]));
        assert_eq!(catalog.lookup(3.0), Some(id));
        assert_eq!(catalog.insert_as(3.0, stim("8", "b.wav")), id);
        assert_eq!(catalog.lookup(8.0), None);
    }

    #[test]
    fn test_closure_is_a_catalog() {
        let catalog = |n: f64| (n == 5.0).then_some(CatalogId(42));
        assert_eq!(catalog.lookup(5.0), Some(CatalogId(42)));
        assert_eq!(catalog.lookup(4.0), None);
    }
}
