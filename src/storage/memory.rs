//! In-memory store.
//!
//! This is the reference implementation of `HierarchicalStore`. The whole
//! tree sits behind one RwLock and each write swaps it in a single step, so
//! readers see either the previous tree or the new one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::HierarchicalStore;
use crate::model::Site;
use crate::Result;

/// In-memory site storage. Clones share the same tree.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    sites: RwLock<Vec<Site>>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed hand-offs.
    pub fn write_count(&self) -> u64 {
        self.inner.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl HierarchicalStore for MemoryStore {
    async fn write_sites(&self, sites: &[Site]) -> Result<()> {
        let tree = sites.to_vec();
        *self.inner.sites.write() = tree;
        self.inner.writes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(sites = sites.len(), "memory store replaced tree");
        Ok(())
    }

    async fn read_sites(&self) -> Result<Vec<Site>> {
        Ok(self.inner.sites.read().clone())
    }

    async fn get_site(&self, name: &str) -> Result<Option<Site>> {
        Ok(self.inner.sites.read().iter().find(|s| s.name == name).cloned())
    }

    async fn site_count(&self) -> Result<usize> {
        Ok(self.inner.sites.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ArrayLayout;

    #[tokio::test]
    async fn test_write_is_idempotent() {
        let store = MemoryStore::new();
        let sites = vec![Site::new("Site1", ArrayLayout::new(1, 16))];
        store.write_sites(&sites).await.unwrap();
        let once = store.read_sites().await.unwrap();
        store.write_sites(&sites).await.unwrap();
        assert_eq!(store.read_sites().await.unwrap(), once);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_write_replaces_previous_tree() {
        let store = MemoryStore::new();
        store.write_sites(&[Site::new("Site1", ArrayLayout::new(1, 16))]).await.unwrap();
        store.write_sites(&[Site::new("Site2", ArrayLayout::new(1, 16))]).await.unwrap();
        assert_eq!(store.site_count().await.unwrap(), 1);
        assert!(store.get_site("Site1").await.unwrap().is_none());
        assert!(store.get_site("Site2").await.unwrap().is_some());
    }
}
