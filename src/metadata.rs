//! Segment-name metadata extraction.
//!
//! Acquisition software names every segment with free text such as
//! `"Site3_L1200R900_e21_BOS"`. Three things are pulled out of it:
//!
//! | Field | Grammar | Example |
//! |-------|---------|---------|
//! | site | leading `Site\d+` | `Site3` |
//! | protocol | alphanumeric run after the final `_`, to end of name | `BOS` |
//! | depths | every `[LR]\d+`, in order, duplicates kept | `L1200`, `R900` |
//!
//! Extraction is a pure function. Missing fields are reported, not guessed.

use std::sync::LazyLock;

use regex::Regex;
use smallvec::SmallVec;

use crate::Error;

static SITE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Site\d+)").expect("site pattern"));
static PROTOCOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_([A-Za-z0-9]+)$").expect("protocol pattern"));
static DEPTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([LR])(\d+)").expect("depth pattern"));

/// Which identifying field a segment name lacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameField {
    Site,
    Protocol,
}

impl std::fmt::Display for NameField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameField::Site => write!(f, "site"),
            NameField::Protocol => write!(f, "protocol"),
        }
    }
}

/// One encoded depth tag, e.g. `L450` → `("ldepth", 450)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthTag {
    pub axis: String,
    /// Raw encoded value, not yet converted to micrometers.
    pub value: i64,
}

impl DepthTag {
    pub fn new(axis: impl Into<String>, value: i64) -> Self {
        Self { axis: axis.into(), value }
    }
}

/// Everything a segment name says about where and what was recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentMetadata {
    pub site: Option<String>,
    pub protocol: Option<String>,
    pub depths: SmallVec<[DepthTag; 2]>,
}

impl SegmentMetadata {
    /// `MalformedSegmentName` for each missing field, site first.
    pub fn problems(&self, segment: &str) -> SmallVec<[Error; 2]> {
        let mut out = SmallVec::new();
        if self.site.is_none() {
            out.push(Error::MalformedSegmentName { segment: segment.to_owned(), missing: NameField::Site });
        }
        if self.protocol.is_none() {
            out.push(Error::MalformedSegmentName { segment: segment.to_owned(), missing: NameField::Protocol });
        }
        out
    }
}

/// Parse a segment name.
pub fn extract(name: &str) -> SegmentMetadata {
    let site = SITE.captures(name).map(|c| c[1].to_owned());
    let protocol = PROTOCOL.captures(name).map(|c| c[1].to_owned());

    let depths = DEPTH
        .captures_iter(name)
        .filter_map(|c| {
            let axis = format!("{}depth", c[1].to_ascii_lowercase());
            match c[2].parse::<i64>() {
                Ok(value) => Some(DepthTag { axis, value }),
                Err(_) => {
                    tracing::warn!(segment = name, tag = &c[0], "depth tag does not fit an integer");
                    None
                }
            }
        })
        .collect();

    SegmentMetadata { site, protocol, depths }
}
