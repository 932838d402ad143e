//! Read-only label sources keyed by study accession.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use log::{info, warn};

use crate::io_utils;

/// Study accession to label, e.g. the finalized disease label of each study.
#[derive(Debug, Clone, Default)]
pub struct StudyLabels {
    labels: HashMap<String, String>,
}

impl StudyLabels {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut labels = HashMap::new();
        for (accession, label) in pairs {
            let label = label.into();
            if !label.trim().is_empty() {
                labels.insert(accession.into(), label.trim().to_string());
            }
        }
        Self { labels }
    }

    /// Reads `accession_column` and `label_column` from a delimited file.
    pub fn load(path: &Path, accession_column: &str, label_column: &str) -> Result<Self> {
        let text = io_utils::read_text(path, encoding_rs::UTF_8)?;
        let mut reader =
            io_utils::open_csv_reader(text.as_bytes(), io_utils::resolve_output_delimiter(path), true);
        let headers = reader
            .headers()
            .with_context(|| format!("Reading header of {path:?}"))?
            .clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| anyhow!("Column '{name}' not found in {path:?}"))
        };
        let accession_idx = find(accession_column)?;
        let label_idx = find(label_column)?;
        let mut pairs = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Reading row {} of {path:?}", row + 2))?;
            let accession = record.get(accession_idx).unwrap_or_default().trim();
            if accession.is_empty() {
                continue;
            }
            let label = record.get(label_idx).unwrap_or_default();
            pairs.push((accession.to_string(), label.to_string()));
        }
        let labels = Self::from_pairs(pairs);
        info!("Loaded {} study label(s) from {:?}", labels.len(), path);
        Ok(labels)
    }

    pub fn get(&self, accession: &str) -> Option<&str> {
        self.labels.get(accession).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Sample name to descriptive text for one study.
///
/// Keys keep their first insertion position; re-inserting a key replaces its
/// text in place. Substring matching walks keys in that order.
#[derive(Debug, Clone, Default)]
pub struct SampleIndex {
    entries: Vec<(String, String)>,
    positions: HashMap<String, usize>,
}

impl SampleIndex {
    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        let key = key.into();
        let text = text.into();
        match self.positions.get(&key) {
            Some(&pos) => self.entries[pos].1 = text,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, text));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.positions
            .get(key)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    pub fn get_key_value(&self, key: &str) -> Option<(&str, &str)> {
        self.positions.get(key).map(|&pos| {
            let (key, text) = &self.entries[pos];
            (key.as_str(), text.as_str())
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    value.trim().trim_matches('"')
}

/// Parses the sample header lines of a GEO series-matrix file.
///
/// Each sample's text is its title followed by every characteristics value
/// joined with `"; "`, indexed under both the title and the GSM accession.
pub fn parse_series_matrix(text: &str) -> SampleIndex {
    let mut titles: Vec<&str> = Vec::new();
    let mut accessions: Vec<&str> = Vec::new();
    let mut characteristics: Vec<Vec<&str>> = Vec::new();

    for line in text.lines() {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut fields = line.split('\t');
        let Some(tag) = fields.next() else { continue };
        if tag == "!Sample_title" {
            titles = fields.collect();
        } else if tag == "!Sample_geo_accession" {
            accessions = fields.collect();
        } else if tag.starts_with("!Sample_characteristics") {
            characteristics.push(fields.collect());
        }
    }

    let mut index = SampleIndex::default();
    for (i, title) in titles.iter().enumerate() {
        let described = characteristics
            .iter()
            .filter_map(|row| row.get(i))
            .map(|value| unquote(value))
            .collect::<Vec<_>>()
            .join("; ");
        let title = unquote(title);
        let full_text = format!("{title} {described}");
        index.insert(title, full_text.clone());
        if let Some(accession) = accessions.get(i).map(|a| unquote(a))
            && !accession.is_empty()
        {
            index.insert(accession, full_text);
        }
    }
    index
}

/// Sample-level descriptive text for every study that has any.
#[derive(Debug, Clone, Default)]
pub struct SampleSources {
    by_study: HashMap<String, SampleIndex>,
}

impl SampleSources {
    pub fn insert_study(&mut self, accession: impl Into<String>, index: SampleIndex) {
        let accession = accession.into();
        match self.by_study.get_mut(&accession) {
            Some(existing) => {
                for (key, text) in index.entries() {
                    existing.insert(key, text);
                }
            }
            None => {
                self.by_study.insert(accession, index);
            }
        }
    }

    pub fn study(&self, accession: &str) -> Option<&SampleIndex> {
        self.by_study.get(accession)
    }

    pub fn study_count(&self) -> usize {
        self.by_study.len()
    }

    /// Loads a (possibly gzipped) series-matrix file, read as Latin-1.
    pub fn load_series_matrix(&mut self, accession: &str, path: &Path) -> Result<()> {
        let text = io_utils::read_text(path, encoding_rs::WINDOWS_1252)
            .with_context(|| format!("Reading series matrix {path:?}"))?;
        let index = parse_series_matrix(&text);
        if index.is_empty() {
            warn!("{accession}: series matrix {path:?} lists no samples");
        } else {
            info!("{accession}: {} sample key(s) from {:?}", index.len(), path);
        }
        self.insert_study(accession, index);
        Ok(())
    }

    /// Loads `accession,sample,text` rows from a delimited file.
    pub fn load_characteristics(&mut self, path: &Path) -> Result<()> {
        let text = io_utils::read_text(path, encoding_rs::UTF_8)?;
        let mut reader =
            io_utils::open_csv_reader(text.as_bytes(), io_utils::resolve_output_delimiter(path), true);
        let mut added = 0usize;
        for (row, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Reading row {} of {path:?}", row + 2))?;
            let (Some(accession), Some(sample), Some(text)) =
                (record.get(0), record.get(1), record.get(2))
            else {
                warn!("Skipping short row {} in {path:?}", row + 2);
                continue;
            };
            let (accession, sample, text) = (accession.trim(), sample.trim(), text.trim());
            if accession.is_empty() || sample.is_empty() || text.is_empty() {
                continue;
            }
            self.by_study
                .entry(accession.to_string())
                .or_default()
                .insert(sample, text);
            added += 1;
        }
        info!("Loaded {added} sample description(s) from {path:?}");
        Ok(())
    }
}

/// `ACC=PATH` pairs as given on the command line.
pub fn parse_accession_path(value: &str) -> Result<(String, PathBuf), String> {
    let (accession, path) = value
        .split_once('=')
        .ok_or_else(|| format!("expected ACCESSION=PATH, got '{value}'"))?;
    let accession = accession.trim();
    if accession.is_empty() || path.trim().is_empty() {
        return Err(format!("expected ACCESSION=PATH, got '{value}'"));
    }
    Ok((accession.to_string(), PathBuf::from(path.trim())))
}
