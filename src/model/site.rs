//! Site → Electrode-Array → {Electrode, Unit}.
//!
//! Ownership is strictly tree-shaped. The `array` fields on `Electrode` and
//! `Unit` are lookup-only back-references (a position in the owning site's
//! array list) and are restamped by [`Site::rebuild_relationships`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{AnalogSignal, AnnotationMap, ProtocolSegment, SignalRef, SpikeRef, SpikeTrain};
use crate::index::{ArrayLayout, ChannelRange, ElectrodeIndex, Lookup, UnitIndex, UnitKey};
use crate::Result;

/// Position of a site within one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId(pub usize);

impl std::fmt::Display for SiteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Electrode / Unit
// ============================================================================

/// One hardware channel, owning the field-potential records recorded on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Electrode {
    pub channel_index: u32,
    /// Owning array position (lookup only).
    pub array: usize,
    pub signals: Vec<AnalogSignal>,
}

/// A spike-sorted source on one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub channel_index: u32,
    pub sort_code: u32,
    pub region: Option<String>,
    pub subregion: Option<String>,
    pub extra_info: Option<String>,
    /// Owning array position (lookup only).
    pub array: usize,
    pub spike_trains: Vec<SpikeTrain>,
}

impl Unit {
    pub fn new(name: impl Into<String>, channel_index: u32, sort_code: u32, array: usize) -> Self {
        Self {
            name: name.into(),
            channel_index,
            sort_code,
            region: None,
            subregion: None,
            extra_info: None,
            array,
            spike_trains: Vec::new(),
        }
    }

    pub fn key(&self) -> UnitKey {
        UnitKey { channel: self.channel_index, sort_code: self.sort_code }
    }
}

// ============================================================================
// ElectrodeArray
// ============================================================================

/// A fixed, contiguous block of hardware channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectrodeArray {
    pub name: String,
    pub index: usize,
    channels: ChannelRange,
    electrodes: Vec<Electrode>,
    units: Vec<Unit>,
    #[serde(skip)]
    electrode_index: ElectrodeIndex,
    #[serde(skip)]
    unit_index: UnitIndex,
}

impl ElectrodeArray {
    pub fn new(index: usize, channels: ChannelRange) -> Self {
        Self {
            name: format!("Array {index}"),
            index,
            channels,
            electrodes: Vec::new(),
            units: Vec::new(),
            electrode_index: ElectrodeIndex::default(),
            unit_index: UnitIndex::default(),
        }
    }

    pub fn channels(&self) -> ChannelRange { self.channels }
    pub fn electrodes(&self) -> &[Electrode] { &self.electrodes }
    pub fn units(&self) -> &[Unit] { &self.units }
    pub fn electrode_index(&self) -> &ElectrodeIndex { &self.electrode_index }
    pub fn unit_index(&self) -> &UnitIndex { &self.unit_index }

    fn check_channel(&self, channel: u32) -> Result<()> {
        if self.channels.contains(channel) {
            Ok(())
        } else {
            Err(self.channels.out_of_range(channel))
        }
    }

    /// Existing electrode on `channel`, or a fresh one.
    pub fn get_or_create_electrode(&mut self, channel: u32) -> Result<Lookup> {
        self.check_channel(channel)?;
        if let Some(pos) = self.electrode_index.get(channel) {
            return Ok(Lookup::found(pos, 1));
        }
        let pos = self.electrodes.len();
        tracing::debug!(array = self.index, channel, "creating electrode");
        self.electrodes.push(Electrode {
            channel_index: channel,
            array: self.index,
            signals: Vec::new(),
        });
        self.electrode_index.insert(channel, pos);
        Ok(Lookup::created(pos))
    }

    /// Existing unit with this (channel, sort code), or a fresh one named `name`.
    ///
    /// When several units already share the identity the first is returned and
    /// `Lookup::matches` reports how many there were.
    pub fn get_or_create_unit(&mut self, channel: u32, sort_code: u32, name: &str) -> Result<Lookup> {
        self.check_channel(channel)?;
        let key = UnitKey { channel, sort_code };
        if let Some((pos, matches)) = self.unit_index.get(key) {
            return Ok(Lookup::found(pos, matches));
        }
        let pos = self.units.len();
        tracing::debug!(array = self.index, channel, sort_code, "creating unit");
        self.units.push(Unit::new(name, channel, sort_code, self.index));
        self.unit_index.insert(key, pos);
        Ok(Lookup::created(pos))
    }

    /// Store a field-potential record under its electrode. Returns the lookup and
    /// the record's position in that electrode's list.
    pub fn attach_field_signal(&mut self, signal: AnalogSignal) -> Result<(Lookup, usize)> {
        let lookup = self.get_or_create_electrode(signal.channel_index)?;
        let signals = &mut self.electrodes[lookup.position].signals;
        signals.push(signal);
        Ok((lookup, signals.len() - 1))
    }

    /// Store a spike train under its unit. Returns the lookup and the record's
    /// position in that unit's list.
    pub fn attach_spike_train(&mut self, train: SpikeTrain, sort_code: u32) -> Result<(Lookup, usize)> {
        let lookup = self.get_or_create_unit(train.channel_index, sort_code, &train.name)?;
        let trains = &mut self.units[lookup.position].spike_trains;
        trains.push(train);
        Ok((lookup, trains.len() - 1))
    }

    /// Append a unit exactly as given, without identity matching.
    ///
    /// Used when merging units that were sorted elsewhere; duplicates surface as
    /// ambiguous lookups afterwards.
    pub fn adopt_unit(&mut self, mut unit: Unit) -> Result<usize> {
        self.check_channel(unit.channel_index)?;
        unit.array = self.index;
        let pos = self.units.len();
        self.unit_index.insert(unit.key(), pos);
        self.units.push(unit);
        Ok(pos)
    }

    /// Recompute both identity indices and every back-reference from the lists.
    pub fn rebuild_indices(&mut self) {
        for e in &mut self.electrodes {
            e.array = self.index;
        }
        for u in &mut self.units {
            u.array = self.index;
        }
        self.electrode_index = ElectrodeIndex::rebuild(&self.electrodes);
        self.unit_index = UnitIndex::rebuild(&self.units);
    }
}

// ============================================================================
// Site
// ============================================================================

/// An anatomical recording location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    /// Depth axis (`"ldepth"`, `"rdepth"`) → micrometers.
    pub depths_um: BTreeMap<String, i64>,
    pub annotations: AnnotationMap,
    layout: ArrayLayout,
    arrays: Vec<ElectrodeArray>,
    segments: Vec<ProtocolSegment>,
}

impl Site {
    /// Create a site with every array of `layout` instantiated up front.
    pub fn new(name: impl Into<String>, layout: ArrayLayout) -> Self {
        let arrays = (0..layout.num_arrays)
            .map(|i| ElectrodeArray::new(i, layout.channel_range(i)))
            .collect();
        Self {
            name: name.into(),
            depths_um: BTreeMap::new(),
            annotations: AnnotationMap::new(),
            layout,
            arrays,
            segments: Vec::new(),
        }
    }

    /// Record a raw encoded depth. The encoding is twice the depth in micrometers.
    pub fn stamp_depth(&mut self, axis: impl Into<String>, raw: i64) {
        self.depths_um.insert(axis.into(), raw.div_euclid(2));
    }

    pub fn layout(&self) -> ArrayLayout { self.layout }
    pub fn arrays(&self) -> &[ElectrodeArray] { &self.arrays }
    pub fn segments(&self) -> &[ProtocolSegment] { &self.segments }

    pub fn array(&self, index: usize) -> Option<&ElectrodeArray> {
        self.arrays.get(index)
    }

    pub fn array_mut(&mut self, index: usize) -> Option<&mut ElectrodeArray> {
        self.arrays.get_mut(index)
    }

    /// The array that owns `channel`.
    pub fn array_for_channel_mut(&mut self, channel: u32) -> Result<&mut ElectrodeArray> {
        let index = self.layout.array_for_channel(channel)?;
        // layout and arrays are created together, so the index is always present
        self.arrays
            .get_mut(index)
            .ok_or_else(|| self.layout.total_range().out_of_range(channel))
    }

    pub fn push_segment(&mut self, segment: ProtocolSegment) -> usize {
        self.segments.push(segment);
        self.segments.len() - 1
    }

    /// Follow a segment's field-signal view back to the owning electrode.
    pub fn resolve_signal(&self, r: &SignalRef) -> Option<&AnalogSignal> {
        self.arrays.get(r.array)?.electrodes.get(r.electrode)?.signals.get(r.record)
    }

    /// Follow a segment's spike-train view back to the owning unit.
    pub fn resolve_spike_train(&self, r: &SpikeRef) -> Option<&SpikeTrain> {
        self.arrays.get(r.array)?.units.get(r.unit)?.spike_trains.get(r.record)
    }

    pub fn electrode_count(&self) -> usize {
        self.arrays.iter().map(|a| a.electrodes.len()).sum()
    }

    pub fn unit_count(&self) -> usize {
        self.arrays.iter().map(|a| a.units.len()).sum()
    }

    /// Every (array, unit identity) implied by the attached spike trains, sorted.
    pub fn unit_roster(&self) -> Vec<(usize, UnitKey)> {
        let mut roster: Vec<(usize, UnitKey)> = self
            .arrays
            .iter()
            .flat_map(|a| {
                a.units.iter().flat_map(move |u| {
                    u.spike_trains.iter().map(move |st| {
                        (a.index, UnitKey { channel: st.channel_index, sort_code: u.sort_code })
                    })
                })
            })
            .collect();
        roster.sort_unstable();
        roster.dedup();
        roster
    }

    /// Recompute every derived view from the ownership lists.
    ///
    /// Restamps array positions, rebuilds identity indices and drops segment
    /// views that no longer resolve. Returns the number of dropped views.
    /// Running it twice in a row changes nothing the second time.
    pub fn rebuild_relationships(&mut self) -> usize {
        for (i, array) in self.arrays.iter_mut().enumerate() {
            array.index = i;
            array.rebuild_indices();
        }

        let mut segments = std::mem::take(&mut self.segments);
        let mut dropped = 0;
        for seg in &mut segments {
            let before = seg.analog_signals.len() + seg.spike_trains.len();
            seg.analog_signals.retain(|r| self.resolve_signal(r).is_some());
            seg.spike_trains.retain(|r| self.resolve_spike_train(r).is_some());
            dropped += before - (seg.analog_signals.len() + seg.spike_trains.len());
        }
        self.segments = segments;

        if dropped > 0 {
            tracing::warn!(site = %self.name, dropped, "dropped dangling segment views");
        }
        dropped
    }
}
