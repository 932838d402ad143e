//! Feature-identifier canonicalization.
//!
//! Canonical keys are the join key across studies, so every function here is
//! a pure function of its input: the same raw identifier always produces the
//! same key.

use crate::{assay::AssayMode, mirbase::SequenceIndex};

pub const UNKNOWN_FEATURE: &str = "Unknown";
pub const SMALL_RNA_PREFIX: &str = "hsa-mir-";

/// Leading tokens removed before the canonical prefix is re-attached.
const STRIPPED_PREFIXES: &[&str] = &["hsa-", "mir-", "mirna-"];
const NAME_TOKENS: &[&str] = &["mir", "let"];
const BARE_PREFIXES: &[&str] = &["hsa", "mir"];

/// Ontology and pathway cross-references (`GO:0006915`, `KEGG:04110`) are not features.
pub fn is_cross_reference(raw: &str) -> bool {
    raw.contains(':')
}

/// Gene symbol when present, else the protein-group identifier, else `Unknown`.
pub fn protein_key(gene: Option<&str>, fallback: Option<&str>) -> String {
    [gene, fallback]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_FEATURE)
        .to_string()
}

/// Picks the miRNA name out of a pipe-delimited composite identifier.
fn select_pipe_segment(lowered: &str) -> Option<&str> {
    lowered.split('|').map(str::trim).find(|segment| {
        NAME_TOKENS.iter().any(|token| segment.contains(token)) && !BARE_PREFIXES.contains(segment)
    })
}

fn strip_known_prefixes(mut value: &str) -> &str {
    while let Some(rest) = STRIPPED_PREFIXES
        .iter()
        .find_map(|prefix| value.strip_prefix(prefix))
    {
        value = rest;
    }
    value
}

/// Normalizes a small-RNA identifier to the `hsa-mir-<suffix>` form.
///
/// `seq|let-7a|extra` becomes `hsa-mir-let-7a`; `hsa-miR-21-5p` becomes
/// `hsa-mir-21-5p`. Already-canonical keys map to themselves.
pub fn canonicalize_small_rna(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let name = if lowered.contains('|') {
        select_pipe_segment(&lowered).unwrap_or(lowered.as_str())
    } else {
        lowered.as_str()
    };
    format!("{SMALL_RNA_PREFIX}{}", strip_known_prefixes(name))
}

#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer<'a> {
    mode: AssayMode,
    sequences: Option<&'a SequenceIndex>,
}

impl<'a> Canonicalizer<'a> {
    pub fn new(mode: AssayMode) -> Self {
        Self {
            mode,
            sequences: None,
        }
    }

    /// Resolves bare nucleotide identifiers through a miRBase index first.
    pub fn with_sequences(mut self, index: Option<&'a SequenceIndex>) -> Self {
        self.sequences = index;
        self
    }

    pub fn mode(&self) -> AssayMode {
        self.mode
    }

    /// Canonical key for one row, or `None` when the row is not a feature.
    ///
    /// `primary` is the identifier column value; `fallback` is only used in
    /// protein mode when the gene cell is blank.
    pub fn key(&self, primary: Option<&str>, fallback: Option<&str>) -> Option<String> {
        match self.mode {
            AssayMode::Protein => {
                let key = protein_key(primary, fallback);
                (!is_cross_reference(&key)).then_some(key)
            }
            AssayMode::SmallRna => {
                let raw = primary?.trim();
                if raw.is_empty() || is_cross_reference(raw) {
                    return None;
                }
                let named = self
                    .sequences
                    .and_then(|index| index.name_for(raw))
                    .unwrap_or(raw);
                Some(canonicalize_small_rna(named))
            }
        }
    }
}
