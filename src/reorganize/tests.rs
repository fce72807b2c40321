use super::*;
use crate::model::{AnalogSignal, CatalogId, Epoch, EventArray, SpikeTrain, Unit};
use crate::index::UnitKey;
use pretty_assertions::assert_eq;

fn catalog(n: f64) -> Option<CatalogId> {
    match n as i64 {
        5 => Some(CatalogId(100)),
        6 => Some(CatalogId(101)),
        _ => None,
    }
}

fn config() -> ImportConfig {
    ImportConfig::default().with_num_arrays(2)
}

fn stimuli(onsets: &[(&str, f64)], offsets: &[f64]) -> (EventArray, EventArray) {
    let mut on = EventArray::new("Stm+");
    let mut off = EventArray::new("Stm-");
    for &(label, t) in onsets {
        on = on.with_event(label, t);
    }
    for &t in offsets {
        off = off.with_event("", t);
    }
    (on, off)
}

fn segment(name: &str) -> RawSegment {
    let (on, off) = stimuli(&[("5", 1.0), ("5", 3.0)], &[2.0, 3.5]);
    RawSegment::new(name)
        .with_analog_signal(AnalogSignal::new("LFP1", 1).with_samples(1000.0, vec![0.0; 4]))
        .with_analog_signal(AnalogSignal::new("LFP1", 17))
        .with_spike_train(SpikeTrain::new("Chan1Code1", 1, vec![0.5, 1.5]))
        .with_spike_train(SpikeTrain::new("Chan17Code2", 17, vec![2.5]))
        .with_event_array(on)
        .with_event_array(off)
}

#[test]
fn test_single_segment_tree() {
    let out = reorganize([segment("Site3_L1200R900_e21_BOS")], &catalog, &config());
    assert_eq!(out.sites.len(), 1);
    assert!(out.report.diagnostics.is_empty(), "{:?}", out.report.diagnostics);

    let site = &out.sites[0];
    assert_eq!(site.name, "Site3");
    assert_eq!(site.depths_um["ldepth"], 600);
    assert_eq!(site.depths_um["rdepth"], 450);
    assert_eq!(site.arrays().len(), 2);
    assert_eq!(site.arrays()[0].electrodes().len(), 1);
    assert_eq!(site.arrays()[1].electrodes()[0].channel_index, 17);
    assert_eq!(site.arrays()[1].units()[0].sort_code, 2);

    let seg = &site.segments()[0];
    assert_eq!(seg.protocol.as_deref(), Some("BOS"));
    assert_eq!(seg.source_name, "Site3_L1200R900_e21_BOS");
    assert_eq!(seg.analog_signals.len(), 2);
    assert_eq!(seg.spike_trains.len(), 2);
    assert_eq!(site.resolve_signal(&seg.analog_signals[0]).unwrap().samples.len(), 4);
    assert_eq!(site.resolve_spike_train(&seg.spike_trains[1]).unwrap().name, "Chan17Code2");
    assert_eq!(
        seg.epochs,
        vec![
            Epoch { label: "Stim5".into(), time: 1.0, duration: 1.0, stim_id: CatalogId(100), number: 5.0 },
            Epoch { label: "Stim5".into(), time: 3.0, duration: 0.5, stim_id: CatalogId(100), number: 5.0 },
        ]
    );
    assert_eq!(out.report.epochs_built, 2);
    assert!(out.report.finished_at.is_some());
}

#[test]
fn test_repeat_site_reuses_containers() {
    let out = reorganize(
        [segment("Site3_L1200_BOS"), segment("Site3_L10_BOS")],
        &catalog,
        &config(),
    );
    assert_eq!(out.sites.len(), 1);
    assert_eq!(out.report.sites_created, 1);

    let site = &out.sites[0];
    // first-seen depth wins
    assert_eq!(site.depths_um["ldepth"], 600);
    // protocol runs are not merged
    assert_eq!(site.segments().len(), 2);
    // one electrode / unit per identity, each owning both records
    assert_eq!(site.electrode_count(), 2);
    assert_eq!(site.unit_count(), 2);
    assert_eq!(site.arrays()[0].electrodes()[0].signals.len(), 2);
    assert_eq!(site.arrays()[0].units()[0].spike_trains.len(), 2);

    let second = &site.segments()[1];
    assert_eq!(second.analog_signals[0].record, 1);
}

#[test]
fn test_segments_without_site_are_skipped_not_fatal() {
    let out = reorganize(
        [segment("Pen1_L100_BOS"), segment("Site4_BOS")],
        &catalog,
        &config(),
    );
    assert_eq!(out.sites.len(), 1);
    assert_eq!(out.report.segments_seen, 2);
    assert_eq!(out.report.segments_skipped, 1);
    assert_eq!(out.report.segments_linked, 1);

    let diag = &out.report.diagnostics[0];
    assert_eq!(diag.segment, "Pen1_L100_BOS");
    assert_eq!(diag.stage, Stage::ParseMetadata);
    assert_eq!(diag.severity, Severity::Error);
    assert!(matches!(diag.error, Error::MalformedSegmentName { missing: NameField::Site, .. }));
}

#[test]
fn test_missing_protocol_links_with_unset_label() {
    let out = reorganize([segment("Site4_L100_")], &catalog, &config());
    let seg = &out.sites[0].segments()[0];
    assert_eq!(seg.protocol, None);
    assert_eq!(out.report.warnings().count(), 1);
    assert!(!out.report.has_errors());
}

#[test]
fn test_cardinality_mismatch_keeps_signals() {
    let (on, off) = stimuli(&[("5", 1.0), ("5", 2.0), ("5", 3.0)], &[1.5, 2.5]);
    let raw = RawSegment::new("Site1_BOS")
        .with_analog_signal(AnalogSignal::new("LFP1", 2))
        .with_spike_train(SpikeTrain::new("Chan2Code1", 2, vec![1.0]))
        .with_event_array(on)
        .with_event_array(off);

    let out = reorganize([raw], &catalog, &config());
    let site = &out.sites[0];
    let seg = &site.segments()[0];
    assert!(seg.epochs.is_empty());
    assert_eq!(seg.analog_signals.len(), 1);
    assert_eq!(seg.spike_trains.len(), 1);
    assert_eq!(site.unit_count(), 1);

    let errors: Vec<_> = out.report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].stage, Stage::BuildEpochs);
    assert!(matches!(
        errors[0].error,
        Error::StimulusCardinalityMismatch { onsets: 3, offsets: 2, .. }
    ));
}

#[test]
fn test_missing_event_arrays_keep_segment() {
    let raw = RawSegment::new("Site1_BOS").with_analog_signal(AnalogSignal::new("LFP1", 2));
    let out = reorganize([raw], &catalog, &config());
    assert_eq!(out.sites[0].segments().len(), 1);
    assert!(matches!(
        &out.report.diagnostics[0].error,
        Error::MissingEventArray(name) if name == "Stm+"
    ));
}

#[test]
fn test_unresolved_and_invalid_stimuli_are_contained() {
    let (on, off) = stimuli(&[("9", 1.0), ("x", 2.0), ("6", 3.0)], &[1.5, 2.5, 3.5]);
    let raw = RawSegment::new("Site1_BOS").with_event_array(on).with_event_array(off);
    let out = reorganize([raw], &catalog, &config());

    let epochs = &out.sites[0].segments()[0].epochs;
    assert_eq!(epochs.len(), 1);
    assert_eq!(epochs[0].label, "Stim6");
    assert_eq!(epochs[0].stim_id, CatalogId(101));

    let kinds: Vec<&'static str> = out
        .report
        .diagnostics
        .iter()
        .map(|d| match d.error {
            Error::InvalidStimulusLabel { .. } => "label",
            Error::UnresolvedStimulus { .. } => "unresolved",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["label", "unresolved", "unresolved"]);
}

#[test]
fn test_out_of_range_channel_drops_only_that_signal() {
    let raw = RawSegment::new("Site1_BOS")
        .with_analog_signal(AnalogSignal::new("LFP1", 40))
        .with_analog_signal(AnalogSignal::new("LFP1", 3))
        .with_spike_train(SpikeTrain::new("Chan0Code1", 0, vec![]));
    let out = reorganize([raw], &catalog, &config());

    let site = &out.sites[0];
    assert_eq!(site.electrode_count(), 1);
    assert_eq!(site.unit_count(), 0);

    let out_of_range: Vec<_> = out
        .report
        .diagnostics
        .iter()
        .filter(|d| matches!(d.error, Error::ChannelOutOfRange { .. }))
        .map(|d| d.stage)
        .collect();
    assert_eq!(out_of_range, vec![Stage::AttachSignals, Stage::AttachUnits]);
}

#[test]
fn test_non_field_signals_are_ignored() {
    let raw = RawSegment::new("Site1_BOS")
        .with_analog_signal(AnalogSignal::new("Wave", 3))
        .with_analog_signal(AnalogSignal::new("lfp", 3));
    let out = reorganize([raw], &catalog, &config());
    assert_eq!(out.sites[0].segments()[0].analog_signals.len(), 1);
}

#[test]
fn test_spike_train_without_sort_code() {
    let raw = RawSegment::new("Site1_BOS").with_spike_train(SpikeTrain::new("Chan3", 3, vec![]));
    let out = reorganize([raw], &catalog, &config());
    assert_eq!(out.sites[0].unit_count(), 0);
    assert!(matches!(
        &out.report.diagnostics[..],
        [Diagnostic { error: Error::MalformedSpikeTrainName(_), stage: Stage::AttachUnits, .. }, ..]
    ));
}

#[test]
fn test_layout_inferred_from_first_site() {
    let mut raw = RawSegment::new("Site1_BOS");
    for ch in 1..=32 {
        raw = raw.with_analog_signal(AnalogSignal::new("LFP1", ch));
    }
    let later = RawSegment::new("Site2_BOS").with_analog_signal(AnalogSignal::new("LFP1", 1));

    let out = reorganize([raw, later], &catalog, &ImportConfig::default());
    assert_eq!(out.sites[0].arrays().len(), 2);
    // the run keeps the first inferred layout
    assert_eq!(out.sites[1].arrays().len(), 2);
    assert_eq!(out.sites[0].electrode_count(), 32);
}

#[test]
fn test_every_unit_lives_in_one_array_and_roster_matches_spike_trains() {
    let out = reorganize(
        [segment("Site1_BOS"), segment("Site1_CON"), segment("Site2_BOS")],
        &catalog,
        &config(),
    );

    for site in &out.sites {
        let mut from_views: Vec<(usize, UnitKey)> = site
            .segments()
            .iter()
            .flat_map(|seg| seg.spike_trains.iter())
            .map(|r| {
                let unit = &site.arrays()[r.array].units()[r.unit];
                let st = site.resolve_spike_train(r).unwrap();
                (r.array, UnitKey { channel: st.channel_index, sort_code: unit.sort_code })
            })
            .collect();
        from_views.sort_unstable();
        from_views.dedup();
        assert_eq!(site.unit_roster(), from_views);

        for (i, array) in site.arrays().iter().enumerate() {
            assert!(array.units().iter().all(|u| u.array == i));
            assert_eq!(array.unit_index().len(), array.units().len());
        }
    }
}

#[test]
fn test_final_rebuild_is_idempotent() {
    let mut out = reorganize([segment("Site1_BOS"), segment("Site1_CON")], &catalog, &config());
    let before = out.sites.clone();
    for site in &mut out.sites {
        assert_eq!(site.rebuild_relationships(), 0);
    }
    assert_eq!(out.sites, before);
    assert_eq!(out.report.dropped_views, 0);
}

#[test]
fn test_process_returns_site_or_none() {
    let config = config();
    let mut reorganizer = Reorganizer::new(&config, &catalog);
    assert_eq!(reorganizer.process(segment("Site7_BOS")), Some(SiteId(0)));
    assert_eq!(reorganizer.process(segment("nosite_BOS")), None);
    assert_eq!(reorganizer.registry().len(), 1);
    assert_eq!(reorganizer.report().segments_skipped, 1);
}

#[test]
fn test_ambiguous_unit_warns_and_uses_first_match() {
    let config = config();
    let mut reorganizer = Reorganizer::new(&config, &catalog);
    let site = reorganizer.process(segment("Site3_BOS")).unwrap();
    reorganizer
        .registry
        .get_mut(site)
        .unwrap()
        .array_mut(0)
        .unwrap()
        .adopt_unit(Unit::new("Chan1Code1", 1, 1, 0))
        .unwrap();

    assert_eq!(reorganizer.process(segment("Site3_CON")), Some(site));
    let out = reorganizer.finish();

    let warnings: Vec<_> = out.report.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].segment, "Site3_CON");
    assert_eq!(warnings[0].stage, Stage::AttachUnits);
    assert!(matches!(
        &warnings[0].error,
        Error::AmbiguousUnitIdentity { name, matches: 2 } if name == "Chan1Code1"
    ));
    assert!(!out.report.has_errors());

    let array = &out.sites[0].arrays()[0];
    assert_eq!(array.units().len(), 2);
    assert_eq!(array.units()[0].spike_trains.len(), 2);
    assert!(array.units()[1].spike_trains.is_empty());
    let view = out.sites[0].segments()[1].spike_trains[0];
    assert_eq!(view.unit, 0);
}

#[test]
fn test_inferred_layout_reaches_upper_channels() {
    let mut raw = RawSegment::new("Site1_BOS");
    for ch in 17..=32 {
        raw = raw.with_analog_signal(AnalogSignal::new("LFP1", ch));
    }
    let out = reorganize([raw], &catalog, &ImportConfig::default());
    assert_eq!(out.sites[0].arrays().len(), 2);
    assert_eq!(out.sites[0].arrays()[1].electrodes().len(), 16);
    assert!(!out.report.errors().any(|d| matches!(d.error, Error::ChannelOutOfRange { .. })));
}

#[test]
fn test_oversized_layout_places_channels_without_overflow() {
    let config = ImportConfig::default()
        .with_num_arrays(2)
        .with_channels_per_array(3_000_000_000);
    let raw = RawSegment::new("Site1_BOS")
        .with_analog_signal(AnalogSignal::new("LFP1", 4_000_000_000))
        .with_analog_signal(AnalogSignal::new("LFP1", 2));
    let out = reorganize([raw], &catalog, &config);
    let site = &out.sites[0];
    assert_eq!(site.arrays()[1].channels().last, u32::MAX);
    assert_eq!(site.arrays()[1].electrodes()[0].channel_index, 4_000_000_000);
    assert_eq!(site.arrays()[0].electrodes()[0].channel_index, 2);
}

#[test]
fn test_sort_code_parsing() {
    assert_eq!(sort_code("Chan3Code12").unwrap(), 12);
    assert!(sort_code("Chan3").is_err());
}

#[test]
fn test_diagnostic_display() {
    let out = reorganize([segment("Pen1_BOS")], &catalog, &config());
    let text = out.report.diagnostics[0].to_string();
    assert!(text.starts_with("error [PARSE_METADATA] Pen1_BOS"), "{text}");
}
