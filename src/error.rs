use std::path::PathBuf;

use thiserror::Error;

/// Failures local to one study or to the final merge.
///
/// Every per-study variant is recoverable at the batch level: the study is
/// recorded as failed and the remaining studies carry on. Only
/// [`HarmonizeError::NothingToMerge`] ends a run.
#[derive(Debug, Error)]
pub enum HarmonizeError {
    #[error("study {accession}: no usable schema ({reason})")]
    SchemaResolution { accession: String, reason: String },

    #[error("unreadable input {path:?}: {reason}")]
    UnreadableInput { path: PathBuf, reason: String },

    #[error("study {accession}: no sample reached {threshold} detected feature(s)")]
    EmptyResult { accession: String, threshold: usize },

    #[error("no study produced a harmonized matrix")]
    NothingToMerge,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl HarmonizeError {
    pub fn schema(accession: &str, reason: impl Into<String>) -> Self {
        HarmonizeError::SchemaResolution {
            accession: accession.to_string(),
            reason: reason.into(),
        }
    }

    pub fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        HarmonizeError::UnreadableInput {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-friendly tag used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            HarmonizeError::SchemaResolution { .. } => "schema_resolution",
            HarmonizeError::UnreadableInput { .. } => "unreadable_input",
            HarmonizeError::EmptyResult { .. } => "empty_result",
            HarmonizeError::NothingToMerge => "nothing_to_merge",
            HarmonizeError::InvalidConfig(_) => "invalid_config",
        }
    }
}
