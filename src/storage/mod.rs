//! # Hierarchical Store Trait
//!
//! The contract between an import run and whatever persists its result.
//! The finished tree is handed over in one call; stores must not expose a
//! partially written tree, and writing the same tree twice must leave the
//! same stored state.
//!
//! ## Implementations
//!
//! | Store | Module | Description |
//! |-------|--------|-------------|
//! | `MemoryStore` | `memory` | In-memory for testing/embedding |
//! | `JsonFileStore` | `json` | One JSON document on disk, replaced atomically |

pub mod memory;
pub mod json;

use async_trait::async_trait;

use crate::model::Site;
use crate::Result;

pub use memory::MemoryStore;
pub use json::JsonFileStore;

/// The persistence contract.
#[async_trait]
pub trait HierarchicalStore: Send + Sync + 'static {
    /// Replace the stored tree with `sites`.
    async fn write_sites(&self, sites: &[Site]) -> Result<()>;

    /// Every stored site, in the order they were written.
    async fn read_sites(&self) -> Result<Vec<Site>>;

    /// Look a site up by label.
    ///
    /// Default: read everything and scan.
    async fn get_site(&self, name: &str) -> Result<Option<Site>> {
        Ok(self.read_sites().await?.into_iter().find(|s| s.name == name))
    }

    async fn site_count(&self) -> Result<usize> {
        Ok(self.read_sites().await?.len())
    }
}
