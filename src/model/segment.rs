//! Protocol-Segment and Epoch.

use serde::{Deserialize, Serialize};

/// Durable identity of a stimulus in the external catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogId(pub u64);

impl std::fmt::Display for CatalogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Non-owning view of a field-potential record: array → electrode → record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalRef {
    pub array: usize,
    pub electrode: usize,
    pub record: usize,
}

/// Non-owning view of a spike train: array → unit → record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpikeRef {
    pub array: usize,
    pub unit: usize,
    pub record: usize,
}

/// One labelled stimulus presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Epoch {
    /// `"Stim"` + integer part of the stimulus number.
    pub label: String,
    /// Seconds
    pub time: f64,
    /// Seconds, never negative.
    pub duration: f64,
    pub stim_id: CatalogId,
    /// Raw stimulus number as played.
    pub number: f64,
}

impl Epoch {
    pub fn end(&self) -> f64 {
        self.time + self.duration
    }
}

/// One recording run of a protocol at a site.
///
/// The signal lists are views into records owned by electrodes and units;
/// resolve them through [`Site::resolve_signal`](super::Site::resolve_signal).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSegment {
    /// Unset when the source name carried no protocol.
    pub protocol: Option<String>,
    /// Name of the flat input segment this came from.
    pub source_name: String,
    pub analog_signals: Vec<SignalRef>,
    pub spike_trains: Vec<SpikeRef>,
    /// In presentation order.
    pub epochs: Vec<Epoch>,
}

impl ProtocolSegment {
    pub fn new(protocol: Option<String>, source_name: impl Into<String>) -> Self {
        Self {
            protocol,
            source_name: source_name.into(),
            ..Self::default()
        }
    }
}
