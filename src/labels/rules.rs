//! Declarative vocabularies for condition-label inference.
//!
//! Every keyword list the label cascade consults lives in [`LabelRules`], so
//! alternate vocabularies can be loaded from YAML or injected by tests
//! without touching the cascade itself. Rule order is significant: the first
//! matching rule wins.

use serde::{Deserialize, Serialize};

use crate::error::HarmonizeError;

use super::{
    CANCER_UNSPECIFIED, CASE_UNKNOWN_DISEASE, CASE_UNSPECIFIED, HEALTHY_CONTROL,
    TECHNICAL_CONTROL, UNKNOWN_LABEL,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Case-insensitive substring.
    #[default]
    Substring,
    /// Case-insensitive whole word; used for short acronyms.
    Word,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiseaseRule {
    pub pattern: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "is_substring")]
    pub kind: MatchKind,
}

fn is_substring(kind: &MatchKind) -> bool {
    *kind == MatchKind::Substring
}

impl DiseaseRule {
    pub fn substring(pattern: &str, label: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            label: label.to_string(),
            kind: MatchKind::Substring,
        }
    }

    pub fn word(pattern: &str, label: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            label: label.to_string(),
            kind: MatchKind::Word,
        }
    }

    /// `lowered` must already be lower-case.
    pub fn matches(&self, lowered: &str) -> bool {
        let pattern = self.pattern.to_lowercase();
        match self.kind {
            MatchKind::Substring => lowered.contains(&pattern),
            MatchKind::Word => contains_word(lowered, &pattern),
        }
    }
}

/// True when `needle` occurs in `haystack` bounded by non-alphanumerics.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn contains_any(lowered: &str, tokens: &[String]) -> bool {
    tokens
        .iter()
        .any(|token| !token.is_empty() && lowered.contains(&token.to_lowercase()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelRules {
    /// Tokens in a sample name that mark a healthy control.
    pub sample_name_controls: Vec<String>,
    /// Tokens in a sample name that mark a pooled or reference sample.
    pub technical_controls: Vec<String>,
    /// Tokens in free sample text that mark a healthy control.
    pub text_controls: Vec<String>,
    pub diseases: Vec<DiseaseRule>,
    /// Tokens that mark a diseased sample whose disease is not named.
    pub case_tokens: Vec<String>,
    /// Tokens in study text that mark an unnamed cancer.
    pub cancer_tokens: Vec<String>,
    /// Labels that carry no disease information and may be replaced.
    pub generic_labels: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for LabelRules {
    fn default() -> Self {
        let diseases = vec![
            DiseaseRule::substring("Alzheimer", "Alzheimer's Disease"),
            DiseaseRule::substring("AD patient", "Alzheimer's Disease"),
            DiseaseRule::substring("Parkinson", "Parkinson's Disease"),
            DiseaseRule::substring("PD patient", "Parkinson's Disease"),
            DiseaseRule::substring("Amyotrophic lateral sclerosis", "ALS"),
            DiseaseRule::word("ALS", "ALS"),
            DiseaseRule::substring("Multiple Sclerosis", "Multiple Sclerosis"),
            DiseaseRule::substring("MS patient", "Multiple Sclerosis"),
            DiseaseRule::substring("Schizophrenia", "Schizophrenia"),
            DiseaseRule::substring("Glioblastoma", "Glioblastoma"),
            DiseaseRule::substring("Ovarian Cancer", "Ovarian Cancer"),
            DiseaseRule::substring("Ovarian carcinoma", "Ovarian Cancer"),
            DiseaseRule::substring("Pancreatic Cancer", "Pancreatic Cancer"),
            DiseaseRule::substring("Pancreatic ductal adenocarcinoma", "Pancreatic Cancer"),
            DiseaseRule::substring("Triple-negative breast cancer", "Breast Cancer (TNBC)"),
            DiseaseRule::substring("Breast Cancer", "Breast Cancer"),
            DiseaseRule::substring("Lung Cancer", "Lung Cancer"),
            DiseaseRule::word("NSCLC", "Lung Cancer"),
            DiseaseRule::substring("Lung adenocarcinoma", "Lung Cancer"),
            DiseaseRule::substring("Liver Cancer", "Liver Cancer"),
            DiseaseRule::substring("Hepatocellular carcinoma", "Liver Cancer"),
            DiseaseRule::word("HCC", "Liver Cancer"),
            DiseaseRule::substring("Gastric Cancer", "Gastric Cancer"),
            DiseaseRule::substring("Colorectal Cancer", "Colorectal Cancer"),
            DiseaseRule::substring("Prostate Cancer", "Prostate Cancer"),
            DiseaseRule::substring("Melanoma", "Melanoma"),
            DiseaseRule::substring("COVID", "COVID-19"),
            DiseaseRule::substring("SARS-CoV-2", "COVID-19"),
            DiseaseRule::substring("Sepsis", "Sepsis"),
            DiseaseRule::substring("Septic", "Sepsis"),
            DiseaseRule::substring("Myocardial infarction", "Heart Disease"),
            DiseaseRule::substring("Thrombocytopenia", "Thrombocytopenia"),
            DiseaseRule::substring("Eosinophilic esophagitis", "Eosinophilic Esophagitis"),
            DiseaseRule::substring("Tuberculosis", "Tuberculosis"),
            DiseaseRule::substring("Depression", "Depression"),
            DiseaseRule::word("MDD", "Depression"),
            DiseaseRule::substring("Preterm", "Preterm Birth"),
            DiseaseRule::substring("Diabetes", "Diabetes"),
            DiseaseRule::substring("Rheumatoid Arthritis", "Rheumatoid Arthritis"),
        ];
        Self {
            sample_name_controls: strings(&[
                "control",
                "ctrl",
                "healthy",
                "norm",
                "hc_",
                "_hc",
                "non-disease",
            ]),
            technical_controls: strings(&["pool", "standard", "ref"]),
            text_controls: strings(&[
                "healthy",
                "control",
                "normal",
                "non-tumor",
                "non-cancer",
                "volunteer",
                "h.c.",
            ]),
            diseases,
            case_tokens: strings(&["patient", "case", "tumor", "cancer"]),
            cancer_tokens: strings(&["cancer", "tumor", "carcinoma"]),
            generic_labels: strings(&[
                "case",
                "case (unknown disease)",
                "case (unspecified)",
                "cancer (unspecified)",
                "unknown",
            ]),
        }
    }
}

impl LabelRules {
    pub fn validate(&self) -> Result<(), HarmonizeError> {
        if let Some(rule) = self
            .diseases
            .iter()
            .find(|rule| rule.pattern.trim().is_empty() || rule.label.trim().is_empty())
        {
            return Err(HarmonizeError::InvalidConfig(format!(
                "disease rule {:?} -> {:?} needs both a pattern and a label",
                rule.pattern, rule.label
            )));
        }
        if self.sample_name_controls.is_empty() && self.text_controls.is_empty() {
            return Err(HarmonizeError::InvalidConfig(
                "at least one control token is required".to_string(),
            ));
        }
        Ok(())
    }

    fn match_disease(&self, lowered: &str) -> Option<&str> {
        self.diseases
            .iter()
            .find(|rule| rule.matches(lowered))
            .map(|rule| rule.label.as_str())
    }

    /// Label from a sample name alone, given the study's disease when known.
    pub fn infer_from_sample_name(&self, name: &str, study_disease: Option<&str>) -> String {
        let lowered = name.to_lowercase();
        if contains_any(&lowered, &self.sample_name_controls) {
            return HEALTHY_CONTROL.to_string();
        }
        if contains_any(&lowered, &self.technical_controls) {
            return TECHNICAL_CONTROL.to_string();
        }
        match study_disease.map(str::trim) {
            Some(disease) if !disease.is_empty() && !disease.eq_ignore_ascii_case(UNKNOWN_LABEL) => {
                disease.to_string()
            }
            _ => CASE_UNKNOWN_DISEASE.to_string(),
        }
    }

    /// Label from free text describing one sample.
    pub fn infer_from_text(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        if contains_any(&lowered, &self.text_controls) {
            return HEALTHY_CONTROL.to_string();
        }
        if let Some(label) = self.match_disease(&lowered) {
            return label.to_string();
        }
        if contains_any(&lowered, &self.case_tokens) {
            return CASE_UNSPECIFIED.to_string();
        }
        UNKNOWN_LABEL.to_string()
    }

    /// Disease named by study-level text (title, description, abstract), if any.
    pub fn infer_disease(&self, text: &str) -> Option<String> {
        let lowered = text.to_lowercase();
        if let Some(label) = self.match_disease(&lowered) {
            return Some(label.to_string());
        }
        contains_any(&lowered, &self.cancer_tokens).then(|| CANCER_UNSPECIFIED.to_string())
    }

    pub fn is_generic(&self, label: &str) -> bool {
        let lowered = label.trim().to_lowercase();
        self.generic_labels.iter().any(|g| g.to_lowercase() == lowered)
    }
}

/// Any label mentioning "control" counts as a control, technical ones included.
pub fn is_control_label(label: &str) -> bool {
    label.to_lowercase().contains("control")
}
