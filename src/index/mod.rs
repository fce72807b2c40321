//! Identity indices.
//!
//! Every Electrode-Array owns its electrodes and units as plain lists. The
//! indices here are derived views over those lists: (channel) → electrode
//! position and (channel, sort code) → unit position. They are never
//! serialized and can always be recomputed from the lists they describe.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::{Electrode, Unit};
use crate::{Error, Result};

// ============================================================================
// Array layout
// ============================================================================

/// Inclusive range of raw hardware channel indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRange {
    pub first: u32,
    pub last: u32,
}

impl ChannelRange {
    pub const EMPTY: ChannelRange = ChannelRange { first: u32::MAX, last: 0 };

    pub fn contains(&self, channel: u32) -> bool {
        (self.first..=self.last).contains(&channel)
    }

    pub fn len(&self) -> usize {
        if self.is_empty() { 0 } else { (self.last - self.first + 1) as usize }
    }

    pub fn is_empty(&self) -> bool {
        self.last < self.first
    }

    pub(crate) fn out_of_range(&self, channel: u32) -> Error {
        Error::ChannelOutOfRange { channel, first: self.first, last: self.last }
    }
}

impl std::fmt::Display for ChannelRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.first, self.last)
    }
}

/// How raw channels are split into arrays.
///
/// Channels are 1-based. Array `i` covers
/// `i * channels_per_array + 1 ..= (i + 1) * channels_per_array`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayLayout {
    pub num_arrays: usize,
    pub channels_per_array: u32,
}

impl ArrayLayout {
    pub fn new(num_arrays: usize, channels_per_array: u32) -> Self {
        Self { num_arrays, channels_per_array }
    }

    /// Infer the array count from the channels seen in one segment: enough
    /// arrays to reach the highest channel. A trailing partial block still gets
    /// its own array.
    pub fn infer(channels: impl IntoIterator<Item = u32>, channels_per_array: u32) -> Self {
        let highest = channels.into_iter().max().unwrap_or(0);
        let per = channels_per_array.max(1);
        Self::new(highest.div_ceil(per) as usize, channels_per_array)
    }

    /// Total number of channels the layout covers, `None` if that exceeds `u32`.
    pub fn capacity(&self) -> Option<u32> {
        u32::try_from(self.num_arrays)
            .ok()?
            .checked_mul(self.channels_per_array)
    }

    /// Channel range owned by array `index`.
    ///
    /// Channels are `u32`, so a block that runs past `u32::MAX` is cut short and
    /// a block that starts past it is empty.
    pub fn channel_range(&self, index: usize) -> ChannelRange {
        let per = u64::from(self.channels_per_array);
        let index = index as u64;
        let first = index.checked_mul(per).and_then(|n| n.checked_add(1));
        let last = index.checked_add(1).and_then(|n| n.checked_mul(per));
        match first.map(u32::try_from) {
            Some(Ok(first)) => ChannelRange { first, last: clamp_channel(last) },
            _ => ChannelRange::EMPTY,
        }
    }

    /// Every channel the layout can place.
    pub fn total_range(&self) -> ChannelRange {
        let last = (self.num_arrays as u64).checked_mul(u64::from(self.channels_per_array));
        ChannelRange { first: 1, last: clamp_channel(last) }
    }

    /// `(channel - 1) / channels_per_array`, rejecting channels no array owns.
    pub fn array_for_channel(&self, channel: u32) -> Result<usize> {
        let total = self.total_range();
        if channel == 0 || !total.contains(channel) {
            return Err(total.out_of_range(channel));
        }
        Ok(((channel - 1) / self.channels_per_array) as usize)
    }
}

fn clamp_channel(channel: Option<u64>) -> u32 {
    channel.and_then(|c| u32::try_from(c).ok()).unwrap_or(u32::MAX)
}

// ============================================================================
// Lookup result
// ============================================================================

/// Outcome of a get-or-create against an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    /// Position in the owning array's list.
    pub position: usize,
    pub created: bool,
    /// How many existing entries matched. Above one means the identity is ambiguous
    /// and `position` is the first match.
    pub matches: usize,
}

impl Lookup {
    pub(crate) fn created(position: usize) -> Self {
        Self { position, created: true, matches: 0 }
    }

    pub(crate) fn found(position: usize, matches: usize) -> Self {
        Self { position, created: false, matches }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.matches > 1
    }
}

// ============================================================================
// Electrode index
// ============================================================================

/// channel → electrode position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElectrodeIndex {
    by_channel: HashMap<u32, usize>,
}

impl ElectrodeIndex {
    pub fn rebuild(electrodes: &[Electrode]) -> Self {
        let mut idx = Self::default();
        for (pos, e) in electrodes.iter().enumerate() {
            // first electrode on a channel wins
            idx.by_channel.entry(e.channel_index).or_insert(pos);
        }
        idx
    }

    pub fn get(&self, channel: u32) -> Option<usize> {
        self.by_channel.get(&channel).copied()
    }

    pub(crate) fn insert(&mut self, channel: u32, position: usize) {
        self.by_channel.insert(channel, position);
    }

    pub fn len(&self) -> usize {
        self.by_channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_channel.is_empty()
    }
}

// ============================================================================
// Unit index
// ============================================================================

/// Identity of a unit within its array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitKey {
    pub channel: u32,
    pub sort_code: u32,
}

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Chan{}Code{}", self.channel, self.sort_code)
    }
}

/// (channel, sort code) → every unit position carrying that identity, in list order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitIndex {
    by_key: HashMap<UnitKey, SmallVec<[usize; 1]>>,
}

impl UnitIndex {
    pub fn rebuild(units: &[Unit]) -> Self {
        let mut idx = Self::default();
        for (pos, u) in units.iter().enumerate() {
            idx.insert(u.key(), pos);
        }
        idx
    }

    /// First matching position and the total number of matches.
    pub fn get(&self, key: UnitKey) -> Option<(usize, usize)> {
        let slots = self.by_key.get(&key)?;
        slots.first().map(|&pos| (pos, slots.len()))
    }

    pub(crate) fn insert(&mut self, key: UnitKey, position: usize) {
        self.by_key.entry(key).or_default().push(position);
    }

    /// Distinct identities, sorted.
    pub fn keys(&self) -> Vec<UnitKey> {
        let mut keys: Vec<UnitKey> = self.by_key.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
