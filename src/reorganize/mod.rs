//! # Reorganizer
//!
//! One pass over the flat segments, in input order. Each segment walks a fixed
//! sequence of stages:
//!
//! ```text
//! ParseMetadata → ResolveSite → AttachSignals → AttachUnits → BuildEpochs → LinkSegment
//! ```
//!
//! A stage either succeeds (possibly recording contained diagnostics) or
//! fails, which abandons that segment and moves on to the next one. After the
//! last segment every site's derived indices are rebuilt from its ownership
//! lists.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::config::ImportConfig;
use crate::epoch::{build_epochs, stimulus_numbers};
use crate::index::ArrayLayout;
use crate::metadata::{self, NameField, SegmentMetadata};
use crate::model::{ProtocolSegment, RawSegment, SignalRef, Site, SiteId, SpikeRef};
use crate::registry::SiteRegistry;
use crate::stimulus::StimulusCatalog;
use crate::{Error, Result};

static SORT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Code(\d+)").expect("sort code pattern"));

/// Sort code embedded in a spike-train name, e.g. `"Chan3Code2"` → 2.
pub fn sort_code(name: &str) -> Result<u32> {
    SORT_CODE
        .captures(name)
        .and_then(|c| c[1].parse().ok())
        .ok_or_else(|| Error::MalformedSpikeTrainName(name.to_owned()))
}

// ============================================================================
// Stages and diagnostics
// ============================================================================

/// Per-segment processing stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ParseMetadata,
    ResolveSite,
    AttachSignals,
    AttachUnits,
    BuildEpochs,
    LinkSegment,
}

impl Stage {
    pub const FIRST: Stage = Stage::ParseMetadata;

    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::ParseMetadata => Some(Stage::ResolveSite),
            Stage::ResolveSite => Some(Stage::AttachSignals),
            Stage::AttachSignals => Some(Stage::AttachUnits),
            Stage::AttachUnits => Some(Stage::BuildEpochs),
            Stage::BuildEpochs => Some(Stage::LinkSegment),
            Stage::LinkSegment => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ParseMetadata => "PARSE_METADATA",
            Stage::ResolveSite => "RESOLVE_SITE",
            Stage::AttachSignals => "ATTACH_SIGNALS",
            Stage::AttachUnits => "ATTACH_UNITS",
            Stage::BuildEpochs => "BUILD_EPOCHS",
            Stage::LinkSegment => "LINK_SEGMENT",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

/// A failure or warning, pinned to the segment and stage that produced it.
#[derive(Debug)]
pub struct Diagnostic {
    pub segment: String,
    pub stage: Stage,
    pub severity: Severity,
    pub error: Error,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{level} [{}] {}: {}", self.stage, self.segment, self.error)
    }
}

/// What happened during one run.
#[derive(Debug)]
pub struct ImportReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub segments_seen: usize,
    pub segments_linked: usize,
    pub segments_skipped: usize,
    pub sites_created: usize,
    pub epochs_built: usize,
    /// Segment views dropped by the final rebuild because they no longer resolved.
    pub dropped_views: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ImportReport {
    fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            segments_seen: 0,
            segments_linked: 0,
            segments_skipped: 0,
            sites_created: 0,
            epochs_built: 0,
            dropped_views: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// Diagnostics recorded against one input segment.
    pub fn for_segment<'a>(&'a self, segment: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.segment == segment)
    }
}

/// The finished tree and its report.
#[derive(Debug)]
pub struct Reorganized {
    pub sites: Vec<Site>,
    pub report: ImportReport,
}

// ============================================================================
// Reorganizer
// ============================================================================

/// In-flight state of one segment.
struct SegmentRun {
    raw: RawSegment,
    meta: SegmentMetadata,
    site: Option<SiteId>,
    segment: ProtocolSegment,
}

/// Drives segments through the stage sequence and owns the tree while it grows.
pub struct Reorganizer<'a, C: StimulusCatalog + ?Sized> {
    config: &'a ImportConfig,
    catalog: &'a C,
    registry: SiteRegistry,
    /// Decided by the first site created in the run.
    layout: Option<ArrayLayout>,
    report: ImportReport,
}

impl<'a, C: StimulusCatalog + ?Sized> Reorganizer<'a, C> {
    pub fn new(config: &'a ImportConfig, catalog: &'a C) -> Self {
        Self {
            config,
            catalog,
            registry: SiteRegistry::new(),
            layout: config.fixed_layout(),
            report: ImportReport::new(),
        }
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    pub fn report(&self) -> &ImportReport {
        &self.report
    }

    /// Run one segment through every stage.
    ///
    /// Returns the site it was linked under, or `None` if a stage failed.
    pub fn process(&mut self, raw: RawSegment) -> Option<SiteId> {
        self.report.segments_seen += 1;
        tracing::info!(segment = %raw.name, "processing segment");

        let mut run = SegmentRun {
            raw,
            meta: SegmentMetadata::default(),
            site: None,
            segment: ProtocolSegment::default(),
        };

        let mut stage = Stage::FIRST;
        loop {
            let outcome = match stage {
                Stage::ParseMetadata => self.parse_metadata(&mut run),
                Stage::ResolveSite => self.resolve_site(&mut run),
                Stage::AttachSignals => self.attach_signals(&mut run),
                Stage::AttachUnits => self.attach_units(&mut run),
                Stage::BuildEpochs => self.build_epochs(&mut run),
                Stage::LinkSegment => self.link_segment(&mut run),
            };
            if let Err(error) = outcome {
                self.record(&run.raw.name, stage, error);
                self.report.segments_skipped += 1;
                return None;
            }
            match stage.next() {
                Some(next) => stage = next,
                None => break,
            }
        }
        run.site
    }

    /// Rebuild every site's derived indices and hand over the tree.
    pub fn finish(mut self) -> Reorganized {
        let mut dropped = 0;
        for site in self.registry.sites_mut() {
            dropped += site.rebuild_relationships();
        }
        self.report.dropped_views = dropped;
        self.report.finished_at = Some(Utc::now());
        Reorganized {
            sites: self.registry.into_sites(),
            report: self.report,
        }
    }

    fn record(&mut self, segment: &str, stage: Stage, error: Error) {
        let severity = error.severity();
        tracing::warn!(segment, %stage, ?severity, %error, "import diagnostic");
        self.report.diagnostics.push(Diagnostic {
            segment: segment.to_owned(),
            stage,
            severity,
            error,
        });
    }

    fn site_mut(&mut self, run: &SegmentRun) -> Result<&mut Site> {
        let id = run.site.ok_or_else(|| Error::NotFound(format!("site for segment {:?}", run.raw.name)))?;
        self.registry
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("site {id}")))
    }

    // ========================================================================
    // Stages
    // ========================================================================

    fn parse_metadata(&mut self, run: &mut SegmentRun) -> Result<()> {
        run.meta = metadata::extract(&run.raw.name);
        for problem in run.meta.problems(&run.raw.name) {
            match problem {
                // no site means nowhere to put the segment
                Error::MalformedSegmentName { missing: NameField::Site, .. } => return Err(problem),
                other => self.record(&run.raw.name, Stage::ParseMetadata, other),
            }
        }
        run.segment = ProtocolSegment::new(run.meta.protocol.clone(), run.raw.name.clone());
        Ok(())
    }

    fn resolve_site(&mut self, run: &mut SegmentRun) -> Result<()> {
        let name = run
            .meta
            .site
            .as_deref()
            .ok_or_else(|| Error::NotFound(format!("site id in {:?}", run.raw.name)))?;

        let config = self.config;
        let raw = &run.raw;
        let cached = &mut self.layout;
        let (id, created) = self.registry.get_or_create_with(name, &run.meta.depths, || {
            if let Some(layout) = *cached {
                return layout;
            }
            let fields = raw
                .analog_signals
                .iter()
                .filter(|s| s.is_field_signal(&config.field_signal_prefix))
                .map(|s| s.channel_index);
            let layout = ArrayLayout::infer(fields, config.channels_per_array);
            tracing::info!(arrays = layout.num_arrays, segment = %raw.name, "inferred array layout");
            if layout.num_arrays > 0 {
                *cached = Some(layout);
            }
            layout
        });

        if created {
            self.report.sites_created += 1;
        }
        run.site = Some(id);
        Ok(())
    }

    fn attach_signals(&mut self, run: &mut SegmentRun) -> Result<()> {
        let signals = std::mem::take(&mut run.raw.analog_signals);
        let prefix = self.config.field_signal_prefix.clone();
        let mut problems = Vec::new();

        let site = self.site_mut(run)?;
        for signal in signals {
            if !signal.is_field_signal(&prefix) {
                tracing::debug!(signal = %signal.name, "skipping non-field signal");
                continue;
            }
            let channel = signal.channel_index;
            let attached = site
                .array_for_channel_mut(channel)
                .and_then(|array| {
                    let index = array.index;
                    array.attach_field_signal(signal).map(|(lookup, record)| (index, lookup, record))
                });
            match attached {
                Ok((array, lookup, record)) => {
                    tracing::debug!(channel, array, created = lookup.created, "stored field signal");
                    run.segment.analog_signals.push(SignalRef { array, electrode: lookup.position, record });
                }
                Err(e) => problems.push(e),
            }
        }

        for e in problems {
            self.record(&run.raw.name, Stage::AttachSignals, e);
        }
        Ok(())
    }

    fn attach_units(&mut self, run: &mut SegmentRun) -> Result<()> {
        let trains = std::mem::take(&mut run.raw.spike_trains);
        let mut problems = Vec::new();

        let site = self.site_mut(run)?;
        for train in trains {
            let code = match sort_code(&train.name) {
                Ok(code) => code,
                Err(e) => {
                    problems.push(e);
                    continue;
                }
            };
            let name = train.name.clone();
            let channel = train.channel_index;
            let attached = site
                .array_for_channel_mut(channel)
                .and_then(|array| {
                    let index = array.index;
                    array.attach_spike_train(train, code).map(|(lookup, record)| (index, lookup, record))
                });
            match attached {
                Ok((array, lookup, record)) => {
                    if lookup.is_ambiguous() {
                        problems.push(Error::AmbiguousUnitIdentity { name, matches: lookup.matches });
                    }
                    tracing::debug!(channel, sort_code = code, array, created = lookup.created, "stored spike train");
                    run.segment.spike_trains.push(SpikeRef { array, unit: lookup.position, record });
                }
                Err(e) => problems.push(e),
            }
        }

        for e in problems {
            self.record(&run.raw.name, Stage::AttachUnits, e);
        }
        Ok(())
    }

    fn build_epochs(&mut self, run: &mut SegmentRun) -> Result<()> {
        let name = run.raw.name.clone();
        let onsets = run.raw.event_array(&self.config.onset_event);
        let offsets = run.raw.event_array(&self.config.offset_event);

        let (onsets, offsets) = match (onsets, offsets) {
            (Some(on), Some(off)) => (on, off),
            (on, _) => {
                let missing = if on.is_none() { &self.config.onset_event } else { &self.config.offset_event };
                let error = Error::MissingEventArray(missing.clone());
                self.record(&name, Stage::BuildEpochs, error);
                return Ok(());
            }
        };

        let (numbers, label_problems) = stimulus_numbers(onsets);
        let built = build_epochs(&onsets.times, &offsets.times, &numbers, self.catalog);
        for e in label_problems {
            self.record(&name, Stage::BuildEpochs, e);
        }

        match built {
            Ok(batch) => {
                tracing::info!(segment = %name, epochs = batch.epochs.len(), "built stimulus epochs");
                for e in batch.failures {
                    self.record(&name, Stage::BuildEpochs, e);
                }
                self.report.epochs_built += batch.epochs.len();
                run.segment.epochs = batch.epochs;
            }
            // the segment keeps its signals, just no epochs
            Err(e) => self.record(&name, Stage::BuildEpochs, e),
        }
        Ok(())
    }

    fn link_segment(&mut self, run: &mut SegmentRun) -> Result<()> {
        let segment = std::mem::take(&mut run.segment);
        let protocol = segment.protocol.clone();
        let site = self.site_mut(run)?;
        let position = site.push_segment(segment);
        tracing::info!(site = %site.name, protocol = ?protocol, position, "linked protocol segment");
        self.report.segments_linked += 1;
        Ok(())
    }
}

/// Reorganize a whole recording in one pass.
pub fn reorganize<I, C>(segments: I, catalog: &C, config: &ImportConfig) -> Reorganized
where
    I: IntoIterator<Item = RawSegment>,
    C: StimulusCatalog + ?Sized,
{
    let mut reorganizer = Reorganizer::new(config, catalog);
    for segment in segments {
        reorganizer.process(segment);
    }
    reorganizer.finish()
}

#[cfg(test)]
mod tests;
