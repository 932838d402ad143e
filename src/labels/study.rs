//! Study-level disease labels from repository evidence.

use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::rules::LabelRules;
use crate::io_utils;

/// Curated disease annotations that say nothing about the disease.
const UNINFORMATIVE_ANNOTATIONS: &[&str] = &["disease", "homo sapiens"];

/// One row of the study evidence table consumed by `finalize-labels`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyEvidence {
    #[serde(rename = "Accession")]
    pub accession: String,
    #[serde(rename = "Existing_Label", default)]
    pub existing_label: String,
    /// Curated disease annotations separated by `;`.
    #[serde(rename = "Diseases", default)]
    pub diseases: String,
    #[serde(rename = "Keywords", default)]
    pub keywords: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Abstract", default)]
    pub abstract_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalizedLabel {
    #[serde(rename = "Accession")]
    pub accession: String,
    #[serde(rename = "Final_Disease_Label")]
    pub label: String,
    #[serde(rename = "Label_Source")]
    pub source: String,
}

fn is_specific(label: &str) -> bool {
    let trimmed = label.trim();
    !trimmed.is_empty() && !trimmed.contains("Unspecified") && !trimmed.contains("Unknown")
}

fn curated_diseases(raw: &str) -> Option<String> {
    let kept = raw
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty() && !UNINFORMATIVE_ANNOTATIONS.contains(&d.to_lowercase().as_str()))
        .collect::<Vec<_>>();
    (!kept.is_empty()).then(|| kept.join("; "))
}

/// Picks the best disease label for one study and names where it came from.
pub fn finalize_study_label(evidence: &StudyEvidence, rules: &LabelRules) -> FinalizedLabel {
    let finalized = |label: String, source: &str| FinalizedLabel {
        accession: evidence.accession.clone(),
        label,
        source: source.to_string(),
    };
    if let Some(curated) = curated_diseases(&evidence.diseases) {
        return finalized(curated, "curated");
    }
    if is_specific(&evidence.existing_label) {
        return finalized(evidence.existing_label.trim().to_string(), "existing");
    }
    let description = format!("{} {}", evidence.description, evidence.keywords);
    let inferred = [
        (evidence.abstract_text.as_str(), "abstract"),
        (description.as_str(), "description"),
        (evidence.title.as_str(), "title"),
    ]
    .into_iter()
    .filter(|(text, _)| !text.trim().is_empty())
    .find_map(|(text, source)| rules.infer_disease(text).map(|label| (label, source)));
    match inferred {
        Some((label, source)) => finalized(label, source),
        None => finalized(evidence.existing_label.trim().to_string(), "existing"),
    }
}

pub fn read_evidence(path: &Path) -> Result<Vec<StudyEvidence>> {
    let text = io_utils::read_text(path, encoding_rs::UTF_8)?;
    let mut reader =
        io_utils::open_csv_reader(text.as_bytes(), io_utils::resolve_output_delimiter(path), true);
    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<StudyEvidence>().enumerate() {
        let row = record.with_context(|| format!("Parsing study evidence row {} of {path:?}", idx + 2))?;
        rows.push(row);
    }
    debug!("Read {} study evidence row(s) from {path:?}", rows.len());
    Ok(rows)
}

pub fn finalize_file(input: &Path, output: &Path, rules: &LabelRules) -> Result<Vec<FinalizedLabel>> {
    let evidence = read_evidence(input)?;
    let labels = evidence
        .iter()
        .map(|row| finalize_study_label(row, rules))
        .collect::<Vec<_>>();
    let mut writer = io_utils::open_csv_writer(output)?;
    for label in &labels {
        writer
            .serialize(label)
            .with_context(|| format!("Writing label for {}", label.accession))?;
    }
    writer.flush().context("Flushing finalized labels")?;
    info!("Finalized {} study label(s) into {:?}", labels.len(), output);
    Ok(labels)
}
