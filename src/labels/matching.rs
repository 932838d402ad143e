//! Locating one sample inside a study's sample-level text index.
//!
//! Sample names in quantification tables rarely match the names used by
//! the repository that describes the samples. A [`SampleResolver`] tries an
//! ordered list of [`MatchStrategy`] implementations and stops at the first
//! hit, so the precedence between them is explicit and testable.

use regex::Regex;

use super::sources::SampleIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleMatch<'i> {
    pub strategy: &'static str,
    pub key: &'i str,
    pub text: &'i str,
}

pub trait MatchStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn find<'i>(&self, sample: &str, index: &'i SampleIndex) -> Option<SampleMatch<'i>>;
}

fn lookup<'i>(strategy: &'static str, key: &str, index: &'i SampleIndex) -> Option<SampleMatch<'i>> {
    index
        .get_key_value(key)
        .map(|(key, text)| SampleMatch {
            strategy,
            key,
            text,
        })
}

/// The sample name is itself a key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactName;

impl MatchStrategy for ExactName {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn find<'i>(&self, sample: &str, index: &'i SampleIndex) -> Option<SampleMatch<'i>> {
        lookup(self.name(), sample, index)
    }
}

/// An accession embedded in the sample name (e.g. `GSM123456`) is a key.
#[derive(Debug, Clone)]
pub struct AccessionPattern {
    pattern: Regex,
}

impl AccessionPattern {
    pub fn new(pattern: Regex) -> Self {
        Self { pattern }
    }
}

impl MatchStrategy for AccessionPattern {
    fn name(&self) -> &'static str {
        "accession"
    }

    fn find<'i>(&self, sample: &str, index: &'i SampleIndex) -> Option<SampleMatch<'i>> {
        let found = self.pattern.find(sample)?;
        lookup(self.name(), found.as_str(), index)
    }
}

/// A key contains the sample name or the sample name contains a key.
///
/// Keys are tried in index order and the first containment wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct Containment;

impl MatchStrategy for Containment {
    fn name(&self) -> &'static str {
        "containment"
    }

    fn find<'i>(&self, sample: &str, index: &'i SampleIndex) -> Option<SampleMatch<'i>> {
        if sample.is_empty() {
            return None;
        }
        index
            .entries()
            .find(|(key, _)| !key.is_empty() && (sample.contains(key) || key.contains(sample)))
            .map(|(key, text)| SampleMatch {
                strategy: self.name(),
                key,
                text,
            })
    }
}

pub struct SampleResolver {
    strategies: Vec<Box<dyn MatchStrategy>>,
}

impl SampleResolver {
    pub fn new(strategies: Vec<Box<dyn MatchStrategy>>) -> Self {
        Self { strategies }
    }

    /// Exact name, then embedded accession, then containment.
    pub fn standard(accession_pattern: Regex) -> Self {
        Self::new(vec![
            Box::new(ExactName),
            Box::new(AccessionPattern::new(accession_pattern)),
            Box::new(Containment),
        ])
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn resolve<'i>(&self, sample: &str, index: &'i SampleIndex) -> Option<SampleMatch<'i>> {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.find(sample, index))
    }
}

impl std::fmt::Debug for SampleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleResolver")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}
