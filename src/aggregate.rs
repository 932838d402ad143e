//! Collapses raw rows into one row per canonical feature key.

use std::collections::BTreeMap;

use log::debug;

use crate::{
    canonical::Canonicalizer, matrix::FeatureMatrix, raw_table::RawTable, schema::ResolvedSchema,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub rows_seen: usize,
    pub rows_excluded: usize,
    pub rows_merged: usize,
}

/// Sums every row that maps to the same key, column by column.
///
/// A cell is present when at least one contributing row carried a number
/// there. Missing contributions add nothing, so a key whose rows report zero
/// stays distinct from a key that was never reported.
pub fn aggregate(
    table: &RawTable,
    schema: &ResolvedSchema,
    canonicalizer: &Canonicalizer<'_>,
) -> (FeatureMatrix, AggregationStats) {
    let width = schema.value_columns.len();
    let mut rows: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    let mut stats = AggregationStats::default();
    let feature_index = schema.feature_column.index;

    for row in &table.rows {
        stats.rows_seen += 1;
        let primary = row.get(feature_index).and_then(|cell| cell.as_text());
        let fallback = schema
            .fallback_column
            .and_then(|idx| row.get(idx))
            .and_then(|cell| cell.as_text());
        let Some(key) = canonicalizer.key(primary.as_deref(), fallback.as_deref()) else {
            stats.rows_excluded += 1;
            continue;
        };
        if rows.contains_key(&key) {
            stats.rows_merged += 1;
        }
        let target = rows.entry(key).or_insert_with(|| vec![None; width]);
        for (slot, column) in target.iter_mut().zip(&schema.value_columns) {
            if let Some(value) = row.get(column.index).and_then(|cell| cell.as_number()) {
                *slot = Some(slot.unwrap_or(0.0) + value);
            }
        }
    }

    debug!(
        "Aggregated {} row(s) into {} feature(s); {} excluded, {} merged into an existing key",
        stats.rows_seen,
        rows.len(),
        stats.rows_excluded,
        stats.rows_merged
    );
    let samples = schema.samples().map(|s| s.to_string()).collect();
    (FeatureMatrix { samples, rows }, stats)
}
