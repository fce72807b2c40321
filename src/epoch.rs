//! Stimulus epoch construction.
//!
//! Pairs the onset and offset marker streams of one segment, resolves each
//! presentation against the stimulus catalog and emits one [`Epoch`] per
//! presentation, in presentation order.
//!
//! Failure scope:
//! - stream lengths disagree → the whole batch fails, no epochs
//! - one presentation is unresolved or runs backwards → only that epoch is skipped

use crate::model::{EventArray, Epoch};
use crate::stimulus::StimulusCatalog;
use crate::{Error, Result};

/// Epochs built for one segment, plus the presentations that were skipped.
#[derive(Debug, Default)]
pub struct EpochBatch {
    pub epochs: Vec<Epoch>,
    pub failures: Vec<Error>,
}

/// Label for a stimulus number: `"Stim"` + its integer part.
pub fn epoch_label(number: f64) -> String {
    format!("Stim{}", number.trunc() as i64)
}

/// Parse onset labels into stimulus numbers.
///
/// Unparseable labels become NaN, which no catalog resolves, and are reported
/// as `InvalidStimulusLabel`.
pub fn stimulus_numbers(events: &EventArray) -> (Vec<f64>, Vec<Error>) {
    let mut problems = Vec::new();
    let numbers = events
        .labels
        .iter()
        .enumerate()
        .map(|(position, label)| match label.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) => {
                problems.push(Error::InvalidStimulusLabel { position, label: label.clone() });
                f64::NAN
            }
        })
        .collect();
    (numbers, problems)
}

/// Build one epoch per presentation.
pub fn build_epochs<C>(onsets: &[f64], offsets: &[f64], numbers: &[f64], catalog: &C) -> Result<EpochBatch>
where
    C: StimulusCatalog + ?Sized,
{
    if onsets.len() != offsets.len() || onsets.len() != numbers.len() {
        return Err(Error::StimulusCardinalityMismatch {
            onsets: onsets.len(),
            offsets: offsets.len(),
            numbers: numbers.len(),
        });
    }

    let mut batch = EpochBatch::default();
    for (position, ((&onset, &offset), &number)) in onsets.iter().zip(offsets).zip(numbers).enumerate() {
        let Some(stim_id) = catalog.lookup(number) else {
            batch.failures.push(Error::UnresolvedStimulus { position, number });
            continue;
        };

        let label = epoch_label(number);
        let duration = offset - onset;
        if duration.is_nan() || duration < 0.0 {
            batch.failures.push(Error::NegativeEpochDuration { label, onset, offset });
            continue;
        }

        tracing::debug!(%label, time = onset, duration, %stim_id, "creating epoch");
        batch.epochs.push(Epoch { label, time: onset, duration, stim_id, number });
    }
    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CatalogId;
    use pretty_assertions::assert_eq;

    fn only_five(n: f64) -> Option<CatalogId> {
        (n == 5.0).then_some(CatalogId(7))
    }

    #[test]
    fn test_paired_presentations() {
        let batch = build_epochs(&[1.0, 3.0], &[2.0, 3.5], &[5.0, 5.0], &only_five).unwrap();
        assert!(batch.failures.is_empty());
        assert_eq!(
            batch.epochs,
            vec![
                Epoch { label: "Stim5".into(), time: 1.0, duration: 1.0, stim_id: CatalogId(7), number: 5.0 },
                Epoch { label: "Stim5".into(), time: 3.0, duration: 0.5, stim_id: CatalogId(7), number: 5.0 },
            ]
        );
    }

    #[test]
    fn test_cardinality_mismatch_builds_nothing() {
        let err = build_epochs(&[1.0, 2.0, 3.0], &[1.5, 2.5], &[5.0, 5.0, 5.0], &only_five).unwrap_err();
        assert!(matches!(
            err,
            Error::StimulusCardinalityMismatch { onsets: 3, offsets: 2, numbers: 3 }
        ));
    }

    #[test]
    fn test_unresolved_stimulus_skips_only_that_epoch() {
        let batch = build_epochs(&[1.0, 3.0], &[2.0, 4.0], &[6.0, 5.0], &only_five).unwrap();
        assert_eq!(batch.epochs.len(), 1);
        assert_eq!(batch.epochs[0].time, 3.0);
        assert!(matches!(batch.failures[..], [Error::UnresolvedStimulus { position: 0, .. }]));
    }

    #[test]
    fn test_negative_duration_skips_only_that_epoch() {
        let batch = build_epochs(&[2.0, 3.0], &[1.0, 3.0], &[5.0, 5.0], &only_five).unwrap();
        assert_eq!(batch.epochs.len(), 1);
        assert_eq!(batch.epochs[0].duration, 0.0);
        assert!(matches!(batch.failures[..], [Error::NegativeEpochDuration { .. }]));
    }

    #[test]
    fn test_label_uses_integer_part() {
        assert_eq!(epoch_label(12.7), "Stim12");
        assert_eq!(epoch_label(3.0), "Stim3");
    }

    #[test]
    fn test_bad_labels_become_unresolvable() {
        let events = EventArray::new("Stm+").with_event("4", 0.0).with_event("x", 1.0);
        let (numbers, problems) = stimulus_numbers(&events);
        assert_eq!(numbers[0], 4.0);
        assert!(numbers[1].is_nan());
        assert!(matches!(problems[..], [Error::InvalidStimulusLabel { position: 1, .. }]));
    }
}
