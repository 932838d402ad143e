#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// Protein-group table in the tab-separated layout of quantification software.
///
/// `detected[i]` genes carry a positive intensity in sample `i`; the rest are
/// zero. Two extra rows are flagged as contaminant and reverse hits.
pub fn protein_groups(samples: &[&str], detected: &[usize]) -> String {
    assert_eq!(samples.len(), detected.len());
    let genes = detected.iter().copied().max().unwrap_or(0) + 3;
    let mut text = String::from("Protein IDs\tGene names\tReverse\tPotential contaminant\tIntensity");
    for sample in samples {
        write!(text, "\tLFQ intensity {sample}").unwrap();
    }
    text.push('\n');
    for gene in 0..genes {
        write!(text, "P{gene:05}\tGENE{gene}\t\t\t0").unwrap();
        for count in detected {
            let value = if gene < *count { 1000 + gene } else { 0 };
            write!(text, "\t{value}").unwrap();
        }
        text.push('\n');
    }
    write!(text, "REV__P1\tREVGENE\t+\t\t0").unwrap();
    for _ in samples {
        text.push_str("\t5000");
    }
    text.push('\n');
    write!(text, "CON__P2\tKRT1\t\t+\t0").unwrap();
    for _ in samples {
        text.push_str("\t5000");
    }
    text.push('\n');
    text
}

pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("open csv");
    let headers = reader
        .headers()
        .expect("headers")
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows = reader
        .records()
        .map(|r| r.expect("record").iter().map(|f| f.to_string()).collect())
        .collect();
    (headers, rows)
}
