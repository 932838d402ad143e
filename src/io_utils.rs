//! I/O utilities for table reading, writing, decompression, and encodings.
//!
//! All file I/O in omics-harmonize flows through this module. It provides:
//!
//! - **Format sniffing**: extension-based detection (`.csv` → comma,
//!   spreadsheets → calamine, everything else → tab with a whitespace
//!   fallback), looking through a trailing `.gz`.
//! - **Decompression**: gzip inputs are inflated in memory with `flate2`.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Reader/writer construction**: `open_csv_reader`, `open_csv_writer`.

use std::{
    fs::{self, File},
    io::{BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use encoding_rs_io::DecodeReaderBytesBuilder;
use flate2::read::MultiGzDecoder;
use log::warn;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Delimited text with a known single-byte delimiter.
    Delimited(u8),
    /// Tab first; re-read on runs of whitespace when tabs yield one column.
    TabOrWhitespace,
    Spreadsheet,
}

pub fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Extension of the payload, looking through a trailing `.gz`.
pub fn inner_extension(path: &Path) -> Option<String> {
    let target = if is_gzip(path) {
        Path::new(path.file_stem()?)
    } else {
        path
    };
    target
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn sniff_format(path: &Path) -> TableFormat {
    match inner_extension(path).as_deref() {
        Some("csv") => TableFormat::Delimited(DEFAULT_CSV_DELIMITER),
        Some("tsv") => TableFormat::Delimited(DEFAULT_TSV_DELIMITER),
        Some(ext) if SPREADSHEET_EXTENSIONS.contains(&ext) => TableFormat::Spreadsheet,
        _ => TableFormat::TabOrWhitespace,
    }
}

pub fn resolve_output_delimiter(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    }
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

/// Reads a whole file, inflating it when it carries a `.gz` suffix.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path).with_context(|| format!("Opening input file {path:?}"))?;
    let mut buf = Vec::new();
    if is_gzip(path) {
        MultiGzDecoder::new(file)
            .read_to_end(&mut buf)
            .with_context(|| format!("Decompressing {path:?}"))?;
    } else {
        file.read_to_end(&mut buf)
            .with_context(|| format!("Reading {path:?}"))?;
    }
    Ok(buf)
}

/// Decodes bytes to text, stripping a BOM when one is present.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let mut decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .bom_override(true)
        .build(bytes);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .with_context(|| format!("Decoding text as {}", encoding.name()))?;
    if let Some(stripped) = text.strip_prefix('\u{feff}') {
        return Ok(stripped.to_string());
    }
    Ok(text)
}

pub fn read_text(path: &Path, encoding: &'static Encoding) -> Result<String> {
    let bytes = read_bytes(path)?;
    decode_text(&bytes, encoding).with_context(|| format!("Decoding {path:?}"))
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8, has_headers: bool) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_writer(path: &Path) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = Box::new(BufWriter::new(
        File::create(path).with_context(|| format!("Creating output file {path:?}"))?,
    ));
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(resolve_output_delimiter(path))
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(base))
}

/// Hidden sibling of `path` that keeps its extension, so the staged file is
/// written with the same delimiter as the final one.
pub fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".partial.{name}"))
}

/// Moves a fully written staged file over its final destination.
pub fn commit_staged(staged: &Path, target: &Path) -> Result<()> {
    fs::rename(staged, target)
        .with_context(|| format!("Moving {staged:?} into place at {target:?}"))
}

/// Removes staged files left behind by a failed write.
pub fn discard_staged(paths: &[&Path]) {
    for path in paths {
        if path.exists() && fs::remove_file(path).is_err() {
            warn!("Could not remove staged output {path:?}");
        }
    }
}
