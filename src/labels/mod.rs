//! Condition-label inference.
//!
//! Labels come from several partial sources that can disagree: the sample
//! name, free-text characteristics for individual samples, and study-level
//! disease labels. [`cascade::LabelCascade`] reconciles them with a fixed
//! precedence: sample-level evidence beats study-level evidence, which beats
//! sample-name keywords, and a detected control always ends up as
//! [`HEALTHY_CONTROL`].

pub mod cascade;
pub mod matching;
pub mod rules;
pub mod sources;
pub mod study;

pub use cascade::{CascadeSummary, LabelCascade, LabelDecision, LabelEvidence, LabelInputs};
pub use matching::{MatchStrategy, SampleMatch, SampleResolver};
pub use rules::{DiseaseRule, LabelRules, MatchKind};
pub use sources::{SampleIndex, SampleSources, StudyLabels};

pub const HEALTHY_CONTROL: &str = "Healthy Control";
pub const TECHNICAL_CONTROL: &str = "Technical Control";
pub const CASE_UNKNOWN_DISEASE: &str = "Case (Unknown Disease)";
pub const CASE_UNSPECIFIED: &str = "Case (Unspecified)";
pub const CANCER_UNSPECIFIED: &str = "Cancer (Unspecified)";
pub const UNKNOWN_LABEL: &str = "Unknown";
