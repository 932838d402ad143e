//! Run configuration, loaded from YAML or defaulted.

use std::{fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    assay::AssayMode, error::HarmonizeError, labels::LabelRules,
    normalize::NormalizationSettings,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    pub protein: usize,
    pub small_rna: usize,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            protein: 100,
            small_rna: 0,
        }
    }
}

/// Column names of the study label tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelColumns {
    pub accession: String,
    pub study_disease: String,
    pub final_label: String,
}

impl Default for LabelColumns {
    fn default() -> Self {
        Self {
            accession: "Accession".to_string(),
            study_disease: "Enriched_Disease".to_string(),
            final_label: "Final_Disease_Label".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonizeConfig {
    pub min_detected_features: QualityThresholds,
    pub normalization: NormalizationSettings,
    pub sample_accession_pattern: String,
    pub label_columns: LabelColumns,
    pub labels: LabelRules,
}

impl Default for HarmonizeConfig {
    fn default() -> Self {
        Self {
            min_detected_features: QualityThresholds::default(),
            normalization: NormalizationSettings::default(),
            sample_accession_pattern: r"GSM\d+".to_string(),
            label_columns: LabelColumns::default(),
            labels: LabelRules::default(),
        }
    }
}

impl HarmonizeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: HarmonizeConfig = serde_yaml::from_reader(file)
            .with_context(|| format!("Parsing YAML config {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing configuration to YAML")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        let mut file =
            File::create(path).with_context(|| format!("Creating config file {path:?}"))?;
        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Writing config file {path:?}"))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), HarmonizeError> {
        self.accession_regex()?;
        let n = &self.normalization;
        if n.scale_factor.is_nan() || n.scale_factor <= 0.0 {
            return Err(HarmonizeError::InvalidConfig(format!(
                "normalization.scale_factor must be positive, got {}",
                n.scale_factor
            )));
        }
        if !(n.raw_count_max_threshold.is_finite() && n.log_scale_max_threshold.is_finite()) {
            return Err(HarmonizeError::InvalidConfig(
                "normalization thresholds must be finite".to_string(),
            ));
        }
        self.labels.validate()
    }

    pub fn accession_regex(&self) -> Result<Regex, HarmonizeError> {
        Regex::new(&self.sample_accession_pattern).map_err(|err| {
            HarmonizeError::InvalidConfig(format!(
                "sample_accession_pattern '{}': {err}",
                self.sample_accession_pattern
            ))
        })
    }

    pub fn min_detected(&self, mode: AssayMode) -> usize {
        match mode {
            AssayMode::Protein => self.min_detected_features.protein,
            AssayMode::SmallRna => self.min_detected_features.small_rna,
        }
    }
}
