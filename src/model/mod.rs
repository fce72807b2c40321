//! # Recording Tree Model
//!
//! The normalized hierarchy produced by an import run:
//!
//! ```text
//! Site ─┬─ ElectrodeArray ─┬─ Electrode ── AnalogSignal*
//!       │                  └─ Unit ─────── SpikeTrain*
//!       └─ ProtocolSegment ─┬─ SignalRef / SpikeRef (views)
//!                           └─ Epoch*
//! ```
//!
//! Plus the flat records a recording source delivers (`RawSegment` and its
//! signals/events). This module is pure data, no I/O.

pub mod value;
pub mod property_map;
pub mod samples;
pub mod signal;
pub mod site;
pub mod segment;

pub use value::Value;
pub use property_map::{AnnotationMap, annotations};
pub use signal::{AnalogSignal, EventArray, RawSegment, SpikeTrain};
pub use site::{Electrode, ElectrodeArray, Site, SiteId, Unit};
pub use segment::{CatalogId, Epoch, ProtocolSegment, SignalRef, SpikeRef};
