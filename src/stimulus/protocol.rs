//! Tab-delimited protocol files.
//!
//! One row per stimulus; the first cell is always the stimulus number and is
//! what the catalog keys on, whatever name the caller gives that column.
//! Column meaning is supplied by the caller, defaulting to:
//!
//! 1. number
//! 2. original wavefile name
//! 3. wavefile name on the playback hardware
//! 4. class (e.g. `Con`)
//! 5. type (e.g. `Call`)
//! 6. source (e.g. `Unfamiliar`)
//! 7. source sex
//! 8. free-form `key=value` parameters

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{MemoryCatalog, Stimulus};
use crate::{Error, Result};

pub const DEFAULT_PROTOCOL_COLUMNS: [&str; 8] = [
    "number",
    "original_wavfile",
    "tdt_wavefile",
    "stim_class",
    "type",
    "source",
    "source_sex",
    "parameters",
];

/// Parse protocol rows into a catalog.
pub fn parse_protocol<R, C>(reader: R, columns: &[C]) -> Result<MemoryCatalog>
where
    R: BufRead,
    C: AsRef<str>,
{
    let mut catalog = MemoryCatalog::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split('\t').collect();
        // rows are keyed by their first cell, whatever the columns are called
        let number = cells[0].trim().parse::<f64>().map_err(|_| Error::MalformedProtocolRow {
            line: i + 1,
            reason: format!("stimulus number {:?} is not numeric", cells[0]),
        })?;
        let id = catalog.insert_as(number, Stimulus::from_row(columns, cells.as_slice()));
        tracing::debug!(line = i + 1, number, %id, "read protocol row");
    }
    tracing::info!(stimuli = catalog.len(), "parsed protocol");
    Ok(catalog)
}

/// Read a protocol file from disk.
pub fn read_protocol_file<C: AsRef<str>>(path: impl AsRef<Path>, columns: &[C]) -> Result<MemoryCatalog> {
    let file = File::open(path.as_ref())?;
    parse_protocol(BufReader::new(file), columns)
}
