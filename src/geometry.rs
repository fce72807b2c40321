//! Probe channel geometry and the selection boundary.
//!
//! An 8×2 probe can be inserted in four orientations. Each orientation maps
//! the physical grid (row 0 at the top, column 0 on the left) to a different
//! channel numbering:
//!
//! ```text
//!  LB      LT      RT      RB
//!  7  8    0 15   15  0    8  7
//!  6  9    1 14   14  1    9  6
//!  ...     ...     ...     ...
//!  0 15    7  8    8  7   15  0
//! ```
//!
//! A picker UI lives outside this crate. It reports back exactly once with a
//! [`SelectionEvent`], which is resolved against the geometry here.

use serde::{Deserialize, Serialize};

pub const ROWS: usize = 8;
pub const COLS: usize = 2;

/// Channel numbers laid out on the physical grid.
pub type ChannelGrid = [[u32; COLS]; ROWS];

/// One insertion orientation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quadrant {
    /// `"LB"`, `"LT"`, `"RT"` or `"RB"`.
    pub label: String,
    /// Roman numeral shown to the user, `"I"` to `"IV"`.
    pub numeral: String,
    pub channels: ChannelGrid,
}

impl Quadrant {
    /// Channel at a grid position.
    pub fn channel_at(&self, row: usize, col: usize) -> Option<u32> {
        self.channels.get(row)?.get(col).copied()
    }
}

/// Outcome of one interactive pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionEvent {
    RegionSelected(String),
    Cancelled,
}

/// The four orientations of an 8×2 probe whose channels start at `start`.
///
/// `None` when the probe's last channel would not fit in a `u32`.
pub fn eight_by_two(start: u32) -> Option<[Quadrant; 4]> {
    let channels = (ROWS * COLS) as u32;
    start.checked_add(channels - 1)?;

    let mut base: ChannelGrid = [[0; COLS]; ROWS];
    for (row, cells) in base.iter_mut().enumerate() {
        let row = row as u32;
        *cells = [7 - row + start, 8 + row + start];
    }

    let flip_rows = |g: &ChannelGrid| {
        let mut out = *g;
        out.reverse();
        out
    };
    let flip_cols = |g: &ChannelGrid| g.map(|[a, b]| [b, a]);

    let quadrant = |label: &str, numeral: &str, channels: ChannelGrid| Quadrant {
        label: label.to_owned(),
        numeral: numeral.to_owned(),
        channels,
    };

    Some([
        quadrant("LB", "I", base),
        quadrant("LT", "II", flip_rows(&base)),
        quadrant("RT", "III", flip_cols(&flip_rows(&base))),
        quadrant("RB", "IV", flip_cols(&base)),
    ])
}

/// Resolve a pick against a geometry. `None` when cancelled or the label is unknown.
pub fn resolve_selection<'g>(geometry: &'g [Quadrant], event: &SelectionEvent) -> Option<&'g Quadrant> {
    match event {
        SelectionEvent::RegionSelected(label) => {
            let found = geometry.iter().find(|q| &q.label == label);
            if found.is_none() {
                tracing::warn!(region = %label, "selected region is not part of the geometry");
            }
            found
        }
        SelectionEvent::Cancelled => None,
    }
}
