//! Value-scale detection and transformation.
//!
//! Studies arrive as raw counts, counts already scaled by some other tool, or
//! values that are already on a log scale. The branch is chosen from the
//! aggregated matrix alone:
//!
//! | condition                                | branch           |
//! |------------------------------------------|------------------|
//! | every value integral and max > 100       | CPM then log2(x+1) |
//! | max < 50                                 | passthrough      |
//! | otherwise                                | log2(x+1)        |
//!
//! Protein studies always take log2(x+1). The thresholds are heuristics
//! kept fixed so historical inputs reprocess identically.

use std::fmt;

use log::info;
use serde::{Deserialize, Serialize};

use crate::{assay::AssayMode, matrix::FeatureMatrix};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationBranch {
    CountsPerMillionLog2,
    Passthrough,
    Log2,
}

impl fmt::Display for NormalizationBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationBranch::CountsPerMillionLog2 => write!(f, "cpm+log2"),
            NormalizationBranch::Passthrough => write!(f, "passthrough"),
            NormalizationBranch::Log2 => write!(f, "log2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationSettings {
    /// Integral matrices whose maximum exceeds this are treated as raw counts.
    pub raw_count_max_threshold: f64,
    /// Matrices whose maximum is below this are treated as already log-scaled.
    pub log_scale_max_threshold: f64,
    pub scale_factor: f64,
}

impl Default for NormalizationSettings {
    fn default() -> Self {
        Self {
            raw_count_max_threshold: 100.0,
            log_scale_max_threshold: 50.0,
            scale_factor: 1_000_000.0,
        }
    }
}

impl NormalizationSettings {
    pub fn choose_branch(&self, mode: AssayMode, matrix: &FeatureMatrix) -> NormalizationBranch {
        if mode == AssayMode::Protein {
            return NormalizationBranch::Log2;
        }
        let mut max = f64::NEG_INFINITY;
        let mut integral = true;
        let mut any = false;
        for value in matrix.values() {
            any = true;
            max = max.max(value);
            integral &= value.fract() == 0.0;
        }
        if !any {
            return NormalizationBranch::Passthrough;
        }
        if integral && max > self.raw_count_max_threshold {
            NormalizationBranch::CountsPerMillionLog2
        } else if max < self.log_scale_max_threshold {
            NormalizationBranch::Passthrough
        } else {
            NormalizationBranch::Log2
        }
    }

    /// Picks a branch and applies it in place.
    pub fn normalize(&self, mode: AssayMode, matrix: &mut FeatureMatrix) -> NormalizationBranch {
        let branch = self.choose_branch(mode, matrix);
        match branch {
            NormalizationBranch::Passthrough => {}
            NormalizationBranch::Log2 => apply(matrix, |_, value| log2p1(value)),
            NormalizationBranch::CountsPerMillionLog2 => {
                let library_sizes = (0..matrix.sample_count())
                    .map(|sample| matrix.column(sample).flatten().sum::<f64>())
                    .collect::<Vec<_>>();
                let scale = self.scale_factor;
                apply(matrix, |sample, value| {
                    let size = library_sizes[sample];
                    let scaled = if size == 0.0 { 0.0 } else { value / size * scale };
                    log2p1(scaled)
                });
            }
        }
        info!(
            "Normalization branch {branch} over {} feature(s) x {} sample(s)",
            matrix.feature_count(),
            matrix.sample_count()
        );
        branch
    }
}

fn log2p1(value: f64) -> f64 {
    (value + 1.0).log2()
}

/// Rewrites each present cell; results that are not finite become absent.
fn apply<F>(matrix: &mut FeatureMatrix, transform: F)
where
    F: Fn(usize, f64) -> f64,
{
    for row in matrix.rows.values_mut() {
        for (sample, cell) in row.iter_mut().enumerate() {
            if let Some(value) = *cell {
                let next = transform(sample, value);
                *cell = next.is_finite().then_some(next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[(&str, Vec<Option<f64>>)]) -> FeatureMatrix {
        let width = rows.first().map(|(_, r)| r.len()).unwrap_or(0);
        FeatureMatrix {
            samples: (0..width).map(|i| format!("S{i}")).collect(),
            rows: rows.iter().map(|(k, r)| (k.to_string(), r.clone())).collect(),
        }
    }

    #[test]
    fn integral_counts_above_threshold_take_cpm_branch() {
        let mut m = matrix(&[("a", vec![Some(500.0), Some(1.0)]), ("b", vec![Some(500.0), Some(3.0)])]);
        let branch = NormalizationSettings::default().normalize(AssayMode::SmallRna, &mut m);
        assert_eq!(branch, NormalizationBranch::CountsPerMillionLog2);
        let expected = (500_000.0f64 + 1.0).log2();
        assert!((m.get("a", 0).unwrap() - expected).abs() < 1e-9);
        let expected_b1 = (750_000.0f64 + 1.0).log2();
        assert!((m.get("b", 1).unwrap() - expected_b1).abs() < 1e-9);
    }

    #[test]
    fn small_float_matrix_passes_through() {
        let mut m = matrix(&[("a", vec![Some(10.0), Some(2.5)])]);
        let branch = NormalizationSettings::default().normalize(AssayMode::SmallRna, &mut m);
        assert_eq!(branch, NormalizationBranch::Passthrough);
        assert_eq!(m.get("a", 1), Some(2.5));
    }

    #[test]
    fn large_float_matrix_takes_log2() {
        let mut m = matrix(&[("a", vec![Some(1000.0), Some(0.5)])]);
        let branch = NormalizationSettings::default().normalize(AssayMode::SmallRna, &mut m);
        assert_eq!(branch, NormalizationBranch::Log2);
        assert!((m.get("a", 0).unwrap() - 1001f64.log2()).abs() < 1e-9);
    }

    #[test]
    fn integral_matrix_at_threshold_is_not_counts() {
        let m = matrix(&[("a", vec![Some(100.0), Some(4.0)])]);
        let branch = NormalizationSettings::default().choose_branch(AssayMode::SmallRna, &m);
        assert_eq!(branch, NormalizationBranch::Log2);
    }

    #[test]
    fn protein_mode_always_logs() {
        let m = matrix(&[("a", vec![Some(5.0)])]);
        let branch = NormalizationSettings::default().choose_branch(AssayMode::Protein, &m);
        assert_eq!(branch, NormalizationBranch::Log2);
    }

    #[test]
    fn zero_library_column_stays_zero_and_absent_stays_absent() {
        let mut m = matrix(&[
            ("a", vec![Some(200.0), Some(0.0), None]),
            ("b", vec![Some(200.0), Some(0.0), Some(7.0)]),
        ]);
        NormalizationSettings::default().normalize(AssayMode::SmallRna, &mut m);
        assert_eq!(m.get("a", 1), Some(0.0));
        assert_eq!(m.rows["a"][2], None);
    }
}
