use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::io_utils;

/// One retained sample in the harmonized metadata table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub global_id: String,
    pub accession: String,
    pub original_sample_id: String,
    /// Label after sample-name inference and sample-level evidence.
    pub condition: String,
    /// Label after study-level reconciliation.
    pub refined_condition: String,
    pub features_detected: usize,
    pub batch: String,
    #[serde(default)]
    pub label_source: String,
}

pub fn global_id(accession: &str, sample: &str) -> String {
    format!("{accession}_{sample}")
}

impl SampleRecord {
    pub fn new(accession: &str, sample: &str, features_detected: usize) -> Self {
        Self {
            global_id: global_id(accession, sample),
            accession: accession.to_string(),
            original_sample_id: sample.to_string(),
            condition: String::new(),
            refined_condition: String::new(),
            features_detected,
            batch: accession.to_string(),
            label_source: String::new(),
        }
    }
}

pub fn read_metadata(path: &Path) -> Result<Vec<SampleRecord>> {
    let text = io_utils::read_text(path, encoding_rs::UTF_8)?;
    let mut reader =
        io_utils::open_csv_reader(text.as_bytes(), io_utils::resolve_output_delimiter(path), true);
    let mut records = Vec::new();
    for (idx, row) in reader.deserialize::<SampleRecord>().enumerate() {
        let record = row.with_context(|| format!("Parsing metadata row {} of {path:?}", idx + 2))?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_metadata(path: &Path, records: &[SampleRecord]) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path)?;
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("Writing metadata row '{}'", record.global_id))?;
    }
    writer.flush().context("Flushing metadata output")?;
    Ok(())
}
