use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::{assay::AssayMode, normalize::NormalizationBranch, schema::Confidence};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyStatus {
    Merged,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudyReport {
    pub accession: String,
    pub status: StudyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_confidence: Option<Confidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalization: Option<NormalizationBranch>,
    pub features: usize,
    pub samples_kept: usize,
    pub samples_dropped: Vec<String>,
    pub rows_excluded: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl StudyReport {
    pub fn failed(accession: &str, kind: &str, reason: String) -> Self {
        Self {
            accession: accession.to_string(),
            status: StudyStatus::Failed,
            identifier_column: None,
            schema_confidence: None,
            normalization: None,
            features: 0,
            samples_kept: 0,
            samples_dropped: Vec::new(),
            rows_excluded: 0,
            failure_kind: Some(kind.to_string()),
            failure_reason: Some(reason),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunTotals {
    pub studies_merged: usize,
    pub studies_failed: usize,
    pub features: usize,
    pub samples: usize,
    pub duplicate_samples: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: String,
    pub mode: AssayMode,
    pub studies: Vec<StudyReport>,
    pub totals: RunTotals,
}

impl RunReport {
    pub fn new(mode: AssayMode, studies: Vec<StudyReport>, totals: RunTotals) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            mode,
            studies,
            totals,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &StudyReport> {
        self.studies
            .iter()
            .filter(|s| s.status == StudyStatus::Failed)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Creating report file {path:?}"))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self).context("Writing run report JSON")
    }
}
