//! Mature-miRNA sequence index built from a miRBase FASTA file.
//!
//! Some small-RNA tables use the read sequence itself as the row identifier.
//! The index maps such sequences back to a human miRNA name so the row joins
//! with studies that report names.

use std::{collections::HashMap, path::Path, sync::LazyLock};

use anyhow::{Context, Result};
use log::info;
use regex::Regex;

use crate::io_utils;

const HUMAN_PREFIX: &str = "hsa-";

static SEQUENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ACGTUacgtu]{15,}$").expect("sequence pattern is valid")
});

#[derive(Debug, Clone, Default)]
pub struct SequenceIndex {
    by_sequence: HashMap<String, String>,
}

/// Upper-cases and writes thymine as uracil so DNA and RNA spellings agree.
fn normalize_sequence(raw: &str) -> String {
    raw.trim().to_ascii_uppercase().replace('T', "U")
}

pub fn looks_like_sequence(raw: &str) -> bool {
    SEQUENCE_PATTERN.is_match(raw.trim())
}

impl SequenceIndex {
    /// Parses FASTA text, keeping the first human name seen for each sequence.
    pub fn from_fasta(text: &str) -> Self {
        let mut by_sequence = HashMap::new();
        let mut current_name: Option<String> = None;
        let mut current_seq = String::new();

        let mut flush = |name: Option<String>, seq: &mut String| {
            if let Some(name) = name
                && !seq.is_empty()
                && name.starts_with(HUMAN_PREFIX)
            {
                by_sequence.entry(normalize_sequence(seq)).or_insert(name);
            }
            seq.clear();
        };

        for line in text.lines().map(str::trim) {
            if let Some(header) = line.strip_prefix('>') {
                flush(current_name.take(), &mut current_seq);
                current_name = header.split_whitespace().next().map(|s| s.to_string());
            } else if !line.is_empty() {
                current_seq.push_str(line);
            }
        }
        flush(current_name.take(), &mut current_seq);

        Self { by_sequence }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = io_utils::read_text(path, encoding_rs::UTF_8)
            .with_context(|| format!("Reading miRBase FASTA {path:?}"))?;
        let index = Self::from_fasta(&text);
        info!(
            "Loaded {} human mature sequence(s) from {:?}",
            index.len(),
            path
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.by_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sequence.is_empty()
    }

    /// Name for a raw identifier that is a bare nucleotide sequence.
    pub fn name_for(&self, raw: &str) -> Option<&str> {
        if !looks_like_sequence(raw) {
            return None;
        }
        self.by_sequence
            .get(&normalize_sequence(raw))
            .map(|name| name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FASTA: &str = ">hsa-let-7a-5p MIMAT0000062 Homo sapiens let-7a-5p\n\
                         UGAGGUAGUAGGUUGUAUAGUU\n\
                         >mmu-let-7a-5p MIMAT0000521 Mus musculus let-7a-5p\n\
                         UGAGGUAGUAGGUUGUAUAGUU\n\
                         >mmu-miR-1a-3p MIMAT0000123 Mus musculus miR-1a-3p\n\
                         UGGAAUGUAAAGAAGUAUGUAU\n\
                         >hsa-miR-21-5p MIMAT0000076 Homo sapiens miR-21-5p\n\
                         UAGCUUAUCAGACUGA\n\
                         UGUUGA\n";

    #[test]
    fn keeps_human_entries_only() {
        let index = SequenceIndex::from_fasta(FASTA);
        assert_eq!(index.len(), 2);
        assert_eq!(index.name_for("TGGAATGTAAAGAAGTATGTAT"), None);
    }

    #[test]
    fn multi_line_sequences_are_joined_and_dna_spelling_matches() {
        let index = SequenceIndex::from_fasta(FASTA);
        assert_eq!(
            index.name_for("tagcttatcagactgatgttga"),
            Some("hsa-miR-21-5p")
        );
        assert_eq!(
            index.name_for("UGAGGUAGUAGGUUGUAUAGUU"),
            Some("hsa-let-7a-5p")
        );
    }

    #[test]
    fn names_are_not_treated_as_sequences() {
        let index = SequenceIndex::from_fasta(FASTA);
        assert!(!looks_like_sequence("hsa-miR-21-5p"));
        assert_eq!(index.name_for("ACGU"), None);
    }
}
