//! Schema resolution: which column names the features and which hold samples.
//!
//! Laboratories name their columns freely, so resolution is a ranked search
//! rather than a lookup. Every header is scored against an ordered rule list
//! and the outcome carries a [`Confidence`] so callers can log (or refuse)
//! resolutions that only matched a weak rule.
//!
//! ## Identifier column
//!
//! - Protein mode first looks for the exact gene-name headers written by
//!   protein quantification software, keeping the protein-group header as a
//!   per-row fallback.
//! - Otherwise headers are scanned in table order against the substring
//!   tokens `gene`, `mirna`, `feature`, `name`, `id`; the first header that
//!   contains any of them wins.
//! - Failing that, the first column is used unless it is purely numeric.
//!
//! ## Value columns
//!
//! - Protein mode: headers starting with `LFQ intensity ` (falling back to
//!   `Intensity `), the prefix stripped to obtain the sample name.
//! - Small-RNA mode: every numeric column after the identifier column.

use std::fmt;

use log::debug;
use serde::Serialize;

use crate::{assay::AssayMode, error::HarmonizeError, raw_table::RawTable};

const GENE_COLUMN_NAMES: &[&str] = &["gene names", "genenames", "gene_names", "genes"];
const PROTEIN_COLUMN_NAMES: &[&str] = &["majority protein ids", "majority protein id", "protein ids"];

const PRIMARY_VALUE_PREFIX: &str = "LFQ intensity ";
const SECONDARY_VALUE_PREFIX: &str = "Intensity ";

/// Substring tokens in priority order with the confidence a match earns.
const IDENTIFIER_TOKENS: &[(&str, Confidence)] = &[
    ("gene", Confidence::High),
    ("mirna", Confidence::High),
    ("feature", Confidence::Medium),
    ("name", Confidence::Medium),
    ("id", Confidence::Low),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "low"),
            Confidence::Medium => write!(f, "medium"),
            Confidence::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifierCandidate {
    pub index: usize,
    pub header: String,
    pub rule: String,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueColumn {
    pub index: usize,
    pub header: String,
    pub sample: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSchema {
    pub feature_column: IdentifierCandidate,
    /// Protein-group column consulted when the gene cell of a row is blank.
    pub fallback_column: Option<usize>,
    pub value_columns: Vec<ValueColumn>,
    /// Every header that matched some identifier rule, in table order.
    pub candidates: Vec<IdentifierCandidate>,
}

impl ResolvedSchema {
    pub fn confidence(&self) -> Confidence {
        self.feature_column.confidence
    }

    pub fn samples(&self) -> impl Iterator<Item = &str> {
        self.value_columns.iter().map(|c| c.sample.as_str())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaResolver {
    mode: AssayMode,
}

impl SchemaResolver {
    pub fn new(mode: AssayMode) -> Self {
        Self { mode }
    }

    pub fn resolve(
        &self,
        table: &RawTable,
        accession: &str,
    ) -> Result<ResolvedSchema, HarmonizeError> {
        let candidates = rank_identifier_candidates(&table.headers);
        let (feature_column, fallback_column) = match self.mode {
            AssayMode::Protein => match protein_identifier(&table.headers) {
                Some(found) => found,
                None => (self.generic_identifier(table, &candidates, accession)?, None),
            },
            AssayMode::SmallRna => (self.generic_identifier(table, &candidates, accession)?, None),
        };

        let value_columns = match self.mode {
            AssayMode::Protein => prefixed_value_columns(&table.headers),
            AssayMode::SmallRna => numeric_value_columns(table, feature_column.index),
        };
        if value_columns.is_empty() {
            return Err(HarmonizeError::schema(
                accession,
                match self.mode {
                    AssayMode::Protein => "no intensity columns",
                    AssayMode::SmallRna => "no numeric sample columns",
                },
            ));
        }
        debug!(
            "{accession}: identifier '{}' ({} confidence via {}), {} value column(s)",
            feature_column.header,
            feature_column.confidence,
            feature_column.rule,
            value_columns.len()
        );
        Ok(ResolvedSchema {
            feature_column,
            fallback_column,
            value_columns,
            candidates,
        })
    }

    fn generic_identifier(
        &self,
        table: &RawTable,
        candidates: &[IdentifierCandidate],
        accession: &str,
    ) -> Result<IdentifierCandidate, HarmonizeError> {
        if let Some(first) = candidates.first() {
            return Ok(first.clone());
        }
        let Some(header) = table.headers.first() else {
            return Err(HarmonizeError::schema(accession, "table has no columns"));
        };
        if table.is_numeric_column(0) {
            return Err(HarmonizeError::schema(
                accession,
                "no identifier column and the first column is numeric",
            ));
        }
        Ok(IdentifierCandidate {
            index: 0,
            header: header.clone(),
            rule: "first column".to_string(),
            confidence: Confidence::Low,
        })
    }
}

/// Scores every header against the identifier tokens, keeping table order.
pub fn rank_identifier_candidates(headers: &[String]) -> Vec<IdentifierCandidate> {
    headers
        .iter()
        .enumerate()
        .filter_map(|(index, header)| {
            let lowered = header.to_lowercase();
            IDENTIFIER_TOKENS
                .iter()
                .find(|(token, _)| lowered.contains(token))
                .map(|(token, confidence)| IdentifierCandidate {
                    index,
                    header: header.clone(),
                    rule: format!("contains '{token}'"),
                    confidence: *confidence,
                })
        })
        .collect()
}

fn find_exact(headers: &[String], names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.contains(&h.to_lowercase().as_str()))
}

fn protein_identifier(headers: &[String]) -> Option<(IdentifierCandidate, Option<usize>)> {
    let gene = find_exact(headers, GENE_COLUMN_NAMES);
    let protein = find_exact(headers, PROTEIN_COLUMN_NAMES);
    match (gene, protein) {
        (Some(gene), protein) => Some((
            IdentifierCandidate {
                index: gene,
                header: headers[gene].clone(),
                rule: "gene-name column".to_string(),
                confidence: Confidence::High,
            },
            protein,
        )),
        (None, Some(protein)) => Some((
            IdentifierCandidate {
                index: protein,
                header: headers[protein].clone(),
                rule: "protein-group column".to_string(),
                confidence: Confidence::Medium,
            },
            None,
        )),
        (None, None) => None,
    }
}

fn columns_with_prefix(headers: &[String], prefix: &str) -> Vec<ValueColumn> {
    headers
        .iter()
        .enumerate()
        .filter_map(|(index, header)| {
            header.strip_prefix(prefix).map(|sample| ValueColumn {
                index,
                header: header.clone(),
                sample: sample.trim().to_string(),
            })
        })
        .filter(|column| !column.sample.is_empty())
        .collect()
}

pub fn prefixed_value_columns(headers: &[String]) -> Vec<ValueColumn> {
    let primary = columns_with_prefix(headers, PRIMARY_VALUE_PREFIX);
    if !primary.is_empty() {
        return primary;
    }
    columns_with_prefix(headers, SECONDARY_VALUE_PREFIX)
}

pub fn numeric_value_columns(table: &RawTable, feature_index: usize) -> Vec<ValueColumn> {
    table
        .headers
        .iter()
        .enumerate()
        .skip(feature_index + 1)
        .filter(|(index, _)| table.is_numeric_column(*index))
        .map(|(index, header)| ValueColumn {
            index,
            header: header.clone(),
            sample: header.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_table::parse_delimited;

    fn table(text: &str) -> RawTable {
        parse_delimited(text, b',').unwrap()
    }

    #[test]
    fn protein_mode_prefers_gene_column_with_protein_fallback() {
        let t = table(
            "Protein IDs,Majority protein IDs,Gene names,Intensity,Intensity A,LFQ intensity A,LFQ intensity B\n\
             P1,P1,TP53,1,1,1,1\n",
        );
        let schema = SchemaResolver::new(AssayMode::Protein)
            .resolve(&t, "PXD1")
            .unwrap();
        assert_eq!(schema.feature_column.header, "Gene names");
        assert_eq!(schema.confidence(), Confidence::High);
        assert_eq!(schema.fallback_column, Some(0));
        assert_eq!(schema.samples().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn protein_mode_falls_back_to_plain_intensity_prefix() {
        let t = table("Gene names,Intensity,Intensity S1,Intensity S2\nTP53,3,1,2\n");
        let schema = SchemaResolver::new(AssayMode::Protein)
            .resolve(&t, "PXD2")
            .unwrap();
        assert_eq!(schema.samples().collect::<Vec<_>>(), vec!["S1", "S2"]);
    }

    #[test]
    fn protein_mode_without_intensity_columns_is_rejected() {
        let t = table("Gene names,Score\nTP53,3\n");
        let err = SchemaResolver::new(AssayMode::Protein)
            .resolve(&t, "PXD3")
            .unwrap_err();
        assert!(matches!(err, HarmonizeError::SchemaResolution { .. }));
    }

    #[test]
    fn small_rna_first_matching_header_in_table_order_wins() {
        let t = table("Sample ID,miRNA,S1,S2\nx,miR-21,4,5\n");
        let schema = SchemaResolver::new(AssayMode::SmallRna)
            .resolve(&t, "GSE1")
            .unwrap();
        assert_eq!(schema.feature_column.header, "Sample ID");
        assert_eq!(schema.confidence(), Confidence::Low);
        assert_eq!(schema.candidates.len(), 2);
    }

    #[test]
    fn small_rna_value_columns_are_numeric_columns_after_identifier() {
        let t = table("length,miRNA,S1,notes,S2\n22,miR-21,4,abc,5\n");
        let schema = SchemaResolver::new(AssayMode::SmallRna)
            .resolve(&t, "GSE2")
            .unwrap();
        assert_eq!(schema.samples().collect::<Vec<_>>(), vec!["S1", "S2"]);
    }

    #[test]
    fn small_rna_falls_back_to_textual_first_column() {
        let t = table("X,S1,S2\nmiR-21,4,5\n");
        let schema = SchemaResolver::new(AssayMode::SmallRna)
            .resolve(&t, "GSE3")
            .unwrap();
        assert_eq!(schema.feature_column.index, 0);
        assert_eq!(schema.feature_column.rule, "first column");
    }

    #[test]
    fn small_rna_numeric_first_column_is_rejected() {
        let t = table("X,S1,S2\n1,4,5\n2,6,7\n");
        let err = SchemaResolver::new(AssayMode::SmallRna)
            .resolve(&t, "GSE4")
            .unwrap_err();
        assert!(err.to_string().contains("first column is numeric"));
    }
}
