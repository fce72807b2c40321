//! Tree export: serialize a finished site tree.
//!
//! Two shapes:
//!
//! ```text
//! export_json()    → versioned JSON envelope, read back by import_json()
//! export_outline() → indented text outline for reports and logs
//! ```

use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Site;
use crate::{Error, Result};

/// Format tag written into every JSON export.
pub const FORMAT: &str = "ephys-tree/1";

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    format: &'a str,
    exported_at: DateTime<Utc>,
    sites: &'a [Site],
}

#[derive(Deserialize)]
struct EnvelopeIn {
    format: String,
    sites: Vec<Site>,
}

/// Write the tree as one JSON document.
pub fn export_json<W: Write + ?Sized>(sites: &[Site], writer: &mut W) -> Result<()> {
    let envelope = EnvelopeOut { format: FORMAT, exported_at: Utc::now(), sites };
    serde_json::to_writer_pretty(&mut *writer, &envelope)?;
    writeln!(writer)?;
    Ok(())
}

/// Read a JSON export back, rebuilding every derived index.
pub fn import_json<R: Read>(reader: R) -> Result<Vec<Site>> {
    let envelope: EnvelopeIn = serde_json::from_reader(reader)?;
    if envelope.format != FORMAT {
        return Err(Error::StorageError(format!(
            "unsupported export format {:?}, expected {FORMAT:?}",
            envelope.format
        )));
    }
    let mut sites = envelope.sites;
    for site in &mut sites {
        site.rebuild_relationships();
    }
    Ok(sites)
}

/// Write an indented outline of the tree:
///
/// ```text
/// Site3 (ldepth=600um, rdepth=450um)
///   Array 0 [1..=16]: 2 electrodes, 1 units
///   BOS <- Site3_L1200R900_BOS: 2 signals, 1 spike trains, 10 epochs
/// ```
pub fn export_outline<W: Write + ?Sized>(sites: &[Site], writer: &mut W) -> Result<()> {
    for site in sites {
        let depths: Vec<String> = site
            .depths_um
            .iter()
            .map(|(axis, um)| format!("{axis}={um}um"))
            .collect();
        if depths.is_empty() {
            writeln!(writer, "{}", site.name)?;
        } else {
            writeln!(writer, "{} ({})", site.name, depths.join(", "))?;
        }

        for array in site.arrays() {
            writeln!(
                writer,
                "  {} [{}]: {} electrodes, {} units",
                array.name,
                array.channels(),
                array.electrodes().len(),
                array.units().len(),
            )?;
        }

        for seg in site.segments() {
            writeln!(
                writer,
                "  {} <- {}: {} signals, {} spike trains, {} epochs",
                seg.protocol.as_deref().unwrap_or("?"),
                seg.source_name,
                seg.analog_signals.len(),
                seg.spike_trains.len(),
                seg.epochs.len(),
            )?;
        }
    }
    Ok(())
}
