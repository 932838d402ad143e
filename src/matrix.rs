//! Feature-by-sample matrices, per study and harmonized.
//!
//! Cells are `Option<f64>`: `None` means the source never reported a value
//! for that feature and sample, which is different from a reported zero.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};

use crate::io_utils;

pub const FEATURE_HEADER: &str = "feature";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    pub samples: Vec<String>,
    pub rows: BTreeMap<String, Vec<Option<f64>>>,
}

impl FeatureMatrix {
    pub fn new(samples: Vec<String>) -> Self {
        Self {
            samples,
            rows: BTreeMap::new(),
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn feature_count(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, feature: &str, sample: usize) -> Option<f64> {
        self.rows.get(feature).and_then(|row| row.get(sample).copied().flatten())
    }

    /// Every present cell.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.values().flat_map(|row| row.iter().flatten().copied())
    }

    pub fn column(&self, sample: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.rows.values().map(move |row| row[sample])
    }

    /// Keeps only the listed sample columns, in the listed order.
    pub fn select_columns(&self, keep: &[usize]) -> FeatureMatrix {
        let samples = keep.iter().map(|idx| self.samples[*idx].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|(feature, row)| {
                (
                    feature.clone(),
                    keep.iter().map(|idx| row[*idx]).collect::<Vec<_>>(),
                )
            })
            .collect();
        FeatureMatrix { samples, rows }
    }

    pub fn rename_samples(&mut self, names: Vec<String>) {
        debug_assert_eq!(names.len(), self.samples.len());
        self.samples = names;
    }

    /// Outer union of several matrices; sample columns are concatenated in order.
    ///
    /// A sample id already taken by an earlier matrix is skipped; the ids of
    /// the skipped columns are returned alongside the merged matrix.
    pub fn outer_union<'a, I>(parts: I) -> (FeatureMatrix, Vec<String>)
    where
        I: IntoIterator<Item = &'a FeatureMatrix>,
    {
        let parts = parts.into_iter().collect::<Vec<_>>();
        let mut merged = FeatureMatrix::default();
        let mut duplicates = Vec::new();
        let mut placements: Vec<Vec<Option<usize>>> = Vec::with_capacity(parts.len());
        let mut seen = std::collections::HashSet::new();

        for part in &parts {
            let mut placement = Vec::with_capacity(part.samples.len());
            for sample in &part.samples {
                if seen.insert(sample.clone()) {
                    placement.push(Some(merged.samples.len()));
                    merged.samples.push(sample.clone());
                } else {
                    duplicates.push(sample.clone());
                    placement.push(None);
                }
            }
            placements.push(placement);
        }

        let width = merged.samples.len();
        for (part, placement) in parts.iter().zip(&placements) {
            for (feature, row) in &part.rows {
                let target = merged
                    .rows
                    .entry(feature.clone())
                    .or_insert_with(|| vec![None; width]);
                for (value, slot) in row.iter().zip(placement) {
                    if let (Some(value), Some(slot)) = (value, slot) {
                        target[*slot] = Some(*value);
                    }
                }
            }
        }
        (merged, duplicates)
    }

    /// Writes the matrix with features as rows; absent cells stay empty.
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut writer = io_utils::open_csv_writer(path)?;
        let mut header = Vec::with_capacity(self.samples.len() + 1);
        header.push(FEATURE_HEADER.to_string());
        header.extend(self.samples.iter().cloned());
        writer
            .write_record(&header)
            .context("Writing matrix header")?;
        for (feature, row) in &self.rows {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(feature.clone());
            record.extend(row.iter().map(|cell| match cell {
                Some(value) => format_value(*value),
                None => String::new(),
            }));
            writer
                .write_record(&record)
                .with_context(|| format!("Writing matrix row '{feature}'"))?;
        }
        writer.flush().context("Flushing matrix output")?;
        Ok(())
    }
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.6}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(samples: &[&str], rows: &[(&str, Vec<Option<f64>>)]) -> FeatureMatrix {
        FeatureMatrix {
            samples: samples.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|(f, r)| (f.to_string(), r.clone()))
                .collect(),
        }
    }

    #[test]
    fn outer_union_keeps_every_feature_and_sample() {
        let a = matrix(&["A_1", "A_2"], &[("TP53", vec![Some(1.0), None]), ("EGFR", vec![Some(2.0), Some(3.0)])]);
        let b = matrix(&["B_1"], &[("TP53", vec![Some(4.0)]), ("MYC", vec![Some(5.0)])]);
        let (merged, duplicates) = FeatureMatrix::outer_union([&a, &b]);

        assert!(duplicates.is_empty());
        assert_eq!(merged.samples, vec!["A_1", "A_2", "B_1"]);
        assert_eq!(merged.feature_count(), 3);
        assert_eq!(merged.get("TP53", 2), Some(4.0));
        assert_eq!(merged.get("MYC", 0), None);
        assert_eq!(merged.get("TP53", 1), None);
        assert_eq!(merged.get("EGFR", 2), None);
    }

    #[test]
    fn outer_union_skips_repeated_sample_ids() {
        let a = matrix(&["S"], &[("X", vec![Some(1.0)])]);
        let b = matrix(&["S"], &[("X", vec![Some(9.0)])]);
        let (merged, duplicates) = FeatureMatrix::outer_union([&a, &b]);
        assert_eq!(merged.samples, vec!["S"]);
        assert_eq!(merged.get("X", 0), Some(1.0));
        assert_eq!(duplicates, vec!["S"]);
    }

    #[test]
    fn select_columns_reorders_and_drops() {
        let a = matrix(&["a", "b", "c"], &[("X", vec![Some(1.0), Some(2.0), Some(3.0)])]);
        let picked = a.select_columns(&[2, 0]);
        assert_eq!(picked.samples, vec!["c", "a"]);
        assert_eq!(picked.rows["X"], vec![Some(3.0), Some(1.0)]);
    }
}
