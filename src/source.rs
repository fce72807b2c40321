//! Recording sources.
//!
//! A source yields every segment of a recording, fully materialized and in
//! acquisition order. Reading is the only I/O an import run does before the
//! store hand-off.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use crate::model::RawSegment;
use crate::Result;

pub trait RecordingSource {
    fn read_segments(&self) -> Result<Vec<RawSegment>>;
}

impl RecordingSource for [RawSegment] {
    fn read_segments(&self) -> Result<Vec<RawSegment>> {
        Ok(self.to_vec())
    }
}

impl RecordingSource for Vec<RawSegment> {
    fn read_segments(&self) -> Result<Vec<RawSegment>> {
        Ok(self.clone())
    }
}

/// Segments stored as a JSON array of [`RawSegment`].
#[derive(Debug, Clone)]
pub struct JsonSource {
    path: PathBuf,
}

impl JsonSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordingSource for JsonSource {
    fn read_segments(&self) -> Result<Vec<RawSegment>> {
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_vec_source_keeps_order() {
        let source = vec![RawSegment::new("Site1_A"), RawSegment::new("Site1_B")];
        let names: Vec<_> = source.read_segments().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Site1_A", "Site1_B"]);
    }

    #[test]
    fn test_json_source_reads_segments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segments.json");
        let segments = vec![RawSegment::new("Site2_L10_BOS")];
        std::fs::write(&path, serde_json::to_string(&segments).unwrap()).unwrap();

        let read = JsonSource::new(&path).read_segments().unwrap();
        assert_eq!(read, segments);
    }

    #[test]
    fn test_missing_json_source_is_io_error() {
        let err = JsonSource::new("/nonexistent/segments.json").read_segments().unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
