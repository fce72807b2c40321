//! JSON document store.
//!
//! The tree is written to a sibling temp file and renamed over the target, so
//! the document on disk is always a complete export.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::HierarchicalStore;
use crate::export::{export_json, import_json};
use crate::model::Site;
use crate::Result;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".partial");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl HierarchicalStore for JsonFileStore {
    async fn write_sites(&self, sites: &[Site]) -> Result<()> {
        let temp = self.temp_path();
        {
            let mut writer = BufWriter::new(File::create(&temp)?);
            export_json(sites, &mut writer)?;
            writer.flush()?;
        }
        std::fs::rename(&temp, &self.path)?;
        tracing::info!(path = %self.path.display(), sites = sites.len(), "wrote site tree");
        Ok(())
    }

    /// An absent document reads as an empty tree.
    async fn read_sites(&self) -> Result<Vec<Site>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        import_json(BufReader::new(File::open(&self.path)?))
    }
}
