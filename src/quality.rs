use log::{debug, info};

use crate::{error::HarmonizeError, matrix::FeatureMatrix};

#[derive(Debug, Clone, PartialEq)]
pub struct SampleQuality {
    pub sample: String,
    pub detected: usize,
    pub retained: bool,
}

#[derive(Debug, Clone)]
pub struct QualityOutcome {
    pub matrix: FeatureMatrix,
    /// One entry per input sample, in input column order.
    pub samples: Vec<SampleQuality>,
}

impl QualityOutcome {
    pub fn retained(&self) -> impl Iterator<Item = &SampleQuality> {
        self.samples.iter().filter(|s| s.retained)
    }

    pub fn dropped(&self) -> impl Iterator<Item = &SampleQuality> {
        self.samples.iter().filter(|s| !s.retained)
    }
}

/// Number of features with a value above zero in one sample column.
pub fn detected_features(matrix: &FeatureMatrix, sample: usize) -> usize {
    matrix
        .column(sample)
        .filter(|cell| cell.is_some_and(|value| value > 0.0))
        .count()
}

/// Keeps sample columns whose detected-feature count meets `threshold`.
///
/// Dropped columns leave the matrix entirely; a study with no survivors is an
/// [`HarmonizeError::EmptyResult`].
pub fn filter_samples(
    accession: &str,
    matrix: FeatureMatrix,
    threshold: usize,
) -> Result<QualityOutcome, HarmonizeError> {
    let samples = matrix
        .samples
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let detected = detected_features(&matrix, idx);
            SampleQuality {
                sample: name.clone(),
                detected,
                retained: detected >= threshold,
            }
        })
        .collect::<Vec<_>>();

    for dropped in samples.iter().filter(|s| !s.retained) {
        debug!(
            "{accession}: dropping sample '{}' ({} detected < {threshold})",
            dropped.sample, dropped.detected
        );
    }
    let keep = samples
        .iter()
        .enumerate()
        .filter_map(|(idx, s)| s.retained.then_some(idx))
        .collect::<Vec<_>>();
    if keep.is_empty() {
        return Err(HarmonizeError::EmptyResult {
            accession: accession.to_string(),
            threshold,
        });
    }
    if keep.len() < samples.len() {
        info!(
            "{accession}: kept {} of {} sample(s) at threshold {threshold}",
            keep.len(),
            samples.len()
        );
    }
    let matrix = if keep.len() == samples.len() {
        matrix
    } else {
        matrix.select_columns(&keep)
    };
    Ok(QualityOutcome { matrix, samples })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two samples: the first detects `a` features, the second `b`.
    fn matrix_with_detected(a: usize, b: usize) -> FeatureMatrix {
        let total = a.max(b) + 5;
        let rows = (0..total)
            .map(|i| {
                let first = if i < a { Some(1.0) } else { Some(0.0) };
                let second = if i < b { Some(2.0) } else { None };
                (format!("F{i:04}"), vec![first, second])
            })
            .collect();
        FeatureMatrix {
            samples: vec!["keep".into(), "drop".into()],
            rows,
        }
    }

    #[test]
    fn threshold_is_inclusive() {
        let outcome = filter_samples("PXD1", matrix_with_detected(100, 99), 100).unwrap();
        assert_eq!(outcome.matrix.samples, vec!["keep"]);
        assert_eq!(outcome.retained().count(), 1);
        let dropped = outcome.dropped().next().unwrap();
        assert_eq!(dropped.sample, "drop");
        assert_eq!(dropped.detected, 99);
    }

    #[test]
    fn zero_threshold_keeps_everything() {
        let outcome = filter_samples("GSE1", matrix_with_detected(0, 0), 0).unwrap();
        assert_eq!(outcome.matrix.sample_count(), 2);
    }

    #[test]
    fn no_survivors_is_an_empty_result() {
        let err = filter_samples("PXD2", matrix_with_detected(3, 4), 100).unwrap_err();
        assert!(matches!(err, HarmonizeError::EmptyResult { threshold: 100, .. }));
    }
}
