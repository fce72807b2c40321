//! # ephys-tree: Electrophysiology Recording Reorganizer
//!
//! Turns the flat, time-ordered segments an acquisition system writes into a
//! normalized tree organized by recording site and protocol:
//!
//! ```text
//! Site ─┬─ ElectrodeArray ─┬─ Electrode (field potentials)
//!       │                  └─ Unit (spike trains)
//!       └─ ProtocolSegment ── Epoch (one per stimulus presentation)
//! ```
//!
//! ## Design Principles
//!
//! 1. **Trait seams at the edges**: `RecordingSource` in, `StimulusCatalog` for
//!    lookups, `HierarchicalStore` out. The core never does I/O.
//! 2. **Identity-keyed children**: electrodes and units are found by
//!    (channel) and (channel, sort code) within their array, never by pointer.
//! 3. **Contained failures**: a bad signal, epoch or segment is reported as a
//!    [`Diagnostic`] and the run carries on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ephys_tree::{ImportConfig, Importer, RawSegment};
//! use ephys_tree::stimulus::{read_protocol_file, DEFAULT_PROTOCOL_COLUMNS};
//!
//! # async fn example(segments: Vec<RawSegment>) -> ephys_tree::Result<()> {
//! let catalog = read_protocol_file("protocol.txt", &DEFAULT_PROTOCOL_COLUMNS)?;
//! let importer = Importer::open_memory(ImportConfig::default().with_num_arrays(2))?;
//!
//! let report = importer.import(&segments, &catalog).await?;
//! for diag in &report.diagnostics {
//!     eprintln!("{diag}");
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod metadata;
pub mod stimulus;
pub mod index;
pub mod registry;
pub mod epoch;
pub mod reorganize;
pub mod source;
pub mod storage;
pub mod export;
pub mod traversal;
pub mod geometry;
pub mod config;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    AnalogSignal, AnnotationMap, CatalogId, Electrode, ElectrodeArray, Epoch, EventArray,
    ProtocolSegment, RawSegment, SignalRef, Site, SiteId, SpikeRef, SpikeTrain, Unit, Value,
};

// ============================================================================
// Re-exports: Pipeline
// ============================================================================

pub use config::ImportConfig;
pub use index::{ArrayLayout, ChannelRange, UnitKey};
pub use metadata::{NameField, SegmentMetadata};
pub use reorganize::{Diagnostic, ImportReport, Reorganized, Reorganizer, Severity, Stage, reorganize};
pub use source::RecordingSource;
pub use stimulus::{MemoryCatalog, Stimulus, StimulusCatalog};
pub use storage::{HierarchicalStore, MemoryStore};

// ============================================================================
// Top-level Importer handle
// ============================================================================

/// The primary entry point. An `Importer` pairs a store with a configuration
/// and runs whole imports into it.
pub struct Importer<S: HierarchicalStore> {
    store: S,
    config: ImportConfig,
}

impl<S: HierarchicalStore> Importer<S> {
    /// Create an Importer over the given store. Fails on an invalid config.
    pub fn with_store(store: S, config: ImportConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Read every segment, reorganize them, then hand the finished tree to the store.
    ///
    /// Per-signal, per-epoch and per-segment failures end up in the report;
    /// only source and store failures abort the run.
    pub async fn import<R, C>(&self, source: &R, catalog: &C) -> Result<ImportReport>
    where
        R: RecordingSource + ?Sized,
        C: StimulusCatalog + ?Sized,
    {
        let segments = source.read_segments()?;
        tracing::info!(segments = segments.len(), "read recording source");

        let Reorganized { sites, report } = reorganize(segments, catalog, &self.config);

        self.store.write_sites(&sites).await?;
        tracing::info!(
            sites = sites.len(),
            linked = report.segments_linked,
            skipped = report.segments_skipped,
            diagnostics = report.diagnostics.len(),
            "import finished"
        );
        Ok(report)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }
}

/// In-memory store for testing and embedding.
impl Importer<MemoryStore> {
    pub fn open_memory(config: ImportConfig) -> Result<Self> {
        Self::with_store(MemoryStore::new(), config)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed segment name {segment:?}: no {missing} id")]
    MalformedSegmentName { segment: String, missing: NameField },

    #[error("Channel {channel} out of range {first}..={last}")]
    ChannelOutOfRange { channel: u32, first: u32, last: u32 },

    #[error("Ambiguous unit identity {name}: {matches} units match, using the first")]
    AmbiguousUnitIdentity { name: String, matches: usize },

    #[error("Stimulus cardinality mismatch: {onsets} onsets, {offsets} offsets, {numbers} stimulus numbers")]
    StimulusCardinalityMismatch { onsets: usize, offsets: usize, numbers: usize },

    #[error("Unresolved stimulus {number} at presentation {position}")]
    UnresolvedStimulus { position: usize, number: f64 },

    #[error("Negative epoch duration for {label}: onset {onset}, offset {offset}")]
    NegativeEpochDuration { label: String, onset: f64, offset: f64 },

    #[error("Missing event array {0:?}")]
    MissingEventArray(String),

    #[error("Spike train {0:?} carries no sort code")]
    MalformedSpikeTrainName(String),

    #[error("Invalid stimulus label {label:?} at presentation {position}")]
    InvalidStimulusLabel { position: usize, label: String },

    #[error("Malformed protocol row {line}: {reason}")]
    MalformedProtocolRow { line: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the pipeline treats this as advisory rather than a failure.
    pub fn severity(&self) -> Severity {
        match self {
            Error::AmbiguousUnitIdentity { .. }
            | Error::InvalidStimulusLabel { .. }
            | Error::MalformedSegmentName { missing: NameField::Protocol, .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
