use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The two table families the harmonizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum AssayMode {
    /// Protein-group abundance tables (intensity-prefixed sample columns).
    Protein,
    /// Small-RNA count or expression tables (numeric sample columns).
    SmallRna,
}

impl AssayMode {
    /// Column label used for the detected-feature count in metadata output.
    pub fn detected_label(&self) -> &'static str {
        match self {
            AssayMode::Protein => "proteins",
            AssayMode::SmallRna => "small RNAs",
        }
    }
}

impl fmt::Display for AssayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssayMode::Protein => write!(f, "protein"),
            AssayMode::SmallRna => write!(f, "small-rna"),
        }
    }
}
