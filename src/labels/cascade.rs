//! The per-sample label cascade.
//!
//! 1. A starting label: either a label already on record or one inferred
//!    from the sample name and the study disease.
//! 2. When the study has sample-level descriptive text and the sample can be
//!    located in it, the label is re-inferred from that text.
//! 3. Control labels are canonicalized to [`HEALTHY_CONTROL`]; generic
//!    labels are replaced by the study's finalized label when one exists;
//!    anything else is kept.

use std::fmt;

use log::{debug, info};

use super::{
    HEALTHY_CONTROL,
    matching::SampleResolver,
    rules::{LabelRules, is_control_label},
    sources::{SampleSources, StudyLabels},
};
use crate::metadata::SampleRecord;

/// Every external label channel the cascade consults.
#[derive(Debug, Clone, Default)]
pub struct LabelInputs {
    /// Disease inferred for each study, used when naming case samples.
    pub study_diseases: StudyLabels,
    /// Finalized study labels, used to replace generic sample labels.
    pub final_labels: StudyLabels,
    pub samples: SampleSources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelEvidence {
    SampleName,
    PriorLabel,
    SampleText { strategy: &'static str },
}

impl fmt::Display for LabelEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelEvidence::SampleName => write!(f, "sample_name"),
            LabelEvidence::PriorLabel => write!(f, "prior_label"),
            LabelEvidence::SampleText { strategy } => write!(f, "sample_text:{strategy}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalRule {
    ControlCanonicalized,
    StudyLabel,
    Kept,
}

impl fmt::Display for FinalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinalRule::ControlCanonicalized => write!(f, "control"),
            FinalRule::StudyLabel => write!(f, "study_label"),
            FinalRule::Kept => write!(f, "kept"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDecision {
    pub condition: String,
    pub refined: String,
    pub evidence: LabelEvidence,
    pub final_rule: FinalRule,
}

impl LabelDecision {
    pub fn source(&self) -> String {
        format!("{}/{}", self.evidence, self.final_rule)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CascadeSummary {
    pub samples: usize,
    pub sample_text_matches: usize,
    pub study_substitutions: usize,
    pub controls: usize,
}

#[derive(Debug)]
pub struct LabelCascade<'a> {
    rules: &'a LabelRules,
    inputs: &'a LabelInputs,
    resolver: SampleResolver,
}

impl<'a> LabelCascade<'a> {
    pub fn new(rules: &'a LabelRules, inputs: &'a LabelInputs, resolver: SampleResolver) -> Self {
        Self {
            rules,
            inputs,
            resolver,
        }
    }

    /// Steps 1 and 2: the label before study-level reconciliation.
    fn sample_label(
        &self,
        accession: &str,
        sample: &str,
        prior: Option<&str>,
    ) -> (String, LabelEvidence) {
        let (mut label, mut evidence) = match prior.map(str::trim).filter(|p| !p.is_empty()) {
            Some(prior) => (prior.to_string(), LabelEvidence::PriorLabel),
            None => (
                self.rules
                    .infer_from_sample_name(sample, self.inputs.study_diseases.get(accession)),
                LabelEvidence::SampleName,
            ),
        };
        if let Some(index) = self.inputs.samples.study(accession)
            && let Some(found) = self.resolver.resolve(sample, index)
            && !found.text.trim().is_empty()
        {
            debug!(
                "{accession}/{sample}: sample text via {} match on '{}'",
                found.strategy, found.key
            );
            label = self.rules.infer_from_text(found.text);
            evidence = LabelEvidence::SampleText {
                strategy: found.strategy,
            };
        }
        (label, evidence)
    }

    /// Step 3: control canonicalization, then study-label substitution.
    fn final_label(&self, accession: &str, label: &str) -> (String, FinalRule) {
        if is_control_label(label) {
            return (HEALTHY_CONTROL.to_string(), FinalRule::ControlCanonicalized);
        }
        if self.rules.is_generic(label)
            && let Some(study_label) = self.inputs.final_labels.get(accession)
        {
            return (study_label.to_string(), FinalRule::StudyLabel);
        }
        (label.to_string(), FinalRule::Kept)
    }

    pub fn decide(&self, accession: &str, sample: &str, prior: Option<&str>) -> LabelDecision {
        let (condition, evidence) = self.sample_label(accession, sample, prior);
        let (refined, final_rule) = self.final_label(accession, &condition);
        LabelDecision {
            condition,
            refined,
            evidence,
            final_rule,
        }
    }

    /// Labels every record in place.
    ///
    /// With `use_prior`, each record's existing `condition` is the starting
    /// label instead of the sample-name inference.
    pub fn apply(&self, records: &mut [SampleRecord], use_prior: bool) -> CascadeSummary {
        let mut summary = CascadeSummary::default();
        for record in records.iter_mut() {
            let prior = use_prior.then_some(record.condition.as_str());
            let decision = self.decide(&record.accession, &record.original_sample_id, prior);
            summary.samples += 1;
            if matches!(decision.evidence, LabelEvidence::SampleText { .. }) {
                summary.sample_text_matches += 1;
            }
            match decision.final_rule {
                FinalRule::ControlCanonicalized => summary.controls += 1,
                FinalRule::StudyLabel => summary.study_substitutions += 1,
                FinalRule::Kept => {}
            }
            record.label_source = decision.source();
            record.condition = decision.condition;
            record.refined_condition = decision.refined;
        }
        info!(
            "Labelled {} sample(s): {} from sample-level text, {} from study labels, {} control(s)",
            summary.samples,
            summary.sample_text_matches,
            summary.study_substitutions,
            summary.controls
        );
        summary
    }
}
