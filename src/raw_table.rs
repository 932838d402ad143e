//! In-memory raw study tables and the loaders that produce them.
//!
//! A [`RawTable`] keeps the header strings exactly as the laboratory wrote
//! them and types each cell as [`Cell::Empty`], [`Cell::Number`] or
//! [`Cell::Text`]. Loading tries the format sniffed from the file name and
//! falls back to whitespace splitting for tab-less text exports.

use std::{fmt, path::Path};

use calamine::{DataType, Reader, open_workbook_auto};
use encoding_rs::Encoding;
use log::{debug, warn};

use crate::{
    error::HarmonizeError,
    io_utils::{self, TableFormat},
};

/// Per-row quality flag columns written by protein quantification software.
pub const MARKER_COLUMNS: &[&str] = &["Potential contaminant", "Reverse", "Only identified by site"];

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || is_placeholder_token(&trimmed.to_ascii_lowercase()) {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(value) if value.is_nan() => Cell::Empty,
            Ok(value) if looks_numeric(trimmed) => Cell::Number(value),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Text form of the cell; integral numbers render without a fraction.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(text) => Some(text.clone()),
            Cell::Number(value) => Some(format_number(*value)),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text().unwrap_or_default())
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        (value as i64).to_string()
    } else {
        value.to_string()
    }
}

fn is_placeholder_token(lowered: &str) -> bool {
    let stripped = lowered.trim_start_matches('#');
    matches!(
        stripped,
        "na" | "n/a" | "n.a." | "nan" | "-nan" | "null" | "none" | "<na>"
    )
}

/// Rust's float parser accepts `inf` and `infinity`; tables never mean that.
fn looks_numeric(token: &str) -> bool {
    token
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
}

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Builds a table from string records, padding ragged rows.
    ///
    /// A header line one field shorter than the data rows follows the
    /// row-names convention and gains an empty leading header.
    pub fn from_records(mut headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        if let Some(first) = records.first()
            && first.len() == headers.len() + 1
        {
            headers.insert(0, String::new());
        }
        let width = headers.len();
        let rows = records
            .into_iter()
            .filter(|record| record.iter().any(|field| !field.trim().is_empty()))
            .map(|record| {
                let mut cells = record
                    .iter()
                    .take(width)
                    .map(|field| Cell::parse(field))
                    .collect::<Vec<_>>();
                cells.resize(width, Cell::Empty);
                cells
            })
            .collect();
        let headers = headers.into_iter().map(|h| h.trim().to_string()).collect();
        RawTable { headers, rows }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn column(&self, index: usize) -> impl Iterator<Item = &Cell> {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// True when the column holds at least one value and every value is a number.
    pub fn is_numeric_column(&self, index: usize) -> bool {
        let mut seen = false;
        for cell in self.column(index) {
            match cell {
                Cell::Empty => {}
                Cell::Number(_) => seen = true,
                Cell::Text(_) => return false,
            }
        }
        seen
    }

    /// Drops rows flagged in any marker column; returns how many were removed.
    pub fn drop_marked_rows(&mut self) -> usize {
        let marker_indices = MARKER_COLUMNS
            .iter()
            .filter_map(|name| self.column_index(name))
            .collect::<Vec<_>>();
        if marker_indices.is_empty() {
            return 0;
        }
        let before = self.rows.len();
        self.rows
            .retain(|row| marker_indices.iter().all(|idx| row[*idx].is_empty()));
        before - self.rows.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub encoding: &'static Encoding,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
        }
    }
}

/// Loads a table from disk, sniffing its format and removing marker rows.
pub fn load_table(path: &Path, options: &LoadOptions) -> Result<RawTable, HarmonizeError> {
    let mut table = match io_utils::sniff_format(path) {
        TableFormat::Spreadsheet => read_spreadsheet(path)?,
        TableFormat::Delimited(delimiter) => {
            let text = read_text(path, options)?;
            parse_delimited(&text, delimiter).map_err(|err| HarmonizeError::unreadable(path, err))?
        }
        TableFormat::TabOrWhitespace => {
            let text = read_text(path, options)?;
            match parse_delimited(&text, io_utils::DEFAULT_TSV_DELIMITER) {
                Ok(table) if table.column_count() >= 2 => table,
                Ok(_) => {
                    debug!("{path:?} has a single tab column; re-reading on whitespace");
                    parse_whitespace(&text)
                }
                Err(err) => {
                    debug!("Tab parse of {path:?} failed ({err}); re-reading on whitespace");
                    parse_whitespace(&text)
                }
            }
        }
    };
    if table.column_count() == 0 {
        return Err(HarmonizeError::unreadable(path, "no header row"));
    }
    let removed = table.drop_marked_rows();
    if removed > 0 {
        debug!("Removed {removed} contaminant/reverse/site-only row(s) from {path:?}");
    }
    Ok(table)
}

fn read_text(path: &Path, options: &LoadOptions) -> Result<String, HarmonizeError> {
    io_utils::read_text(path, options.encoding)
        .map_err(|err| HarmonizeError::unreadable(path, format!("{err:#}")))
}

pub fn parse_delimited(text: &str, delimiter: u8) -> Result<RawTable, csv::Error> {
    let mut reader = io_utils::open_csv_reader(text.as_bytes(), delimiter, true);
    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(|f| f.to_string()).collect());
    }
    Ok(RawTable::from_records(headers, records))
}

pub fn parse_whitespace(text: &str) -> RawTable {
    let mut lines = text.lines().filter(|line| !line.trim().is_empty());
    let headers = lines
        .next()
        .map(|line| line.split_whitespace().map(|s| s.to_string()).collect())
        .unwrap_or_default();
    let records = lines
        .map(|line| line.split_whitespace().map(|s| s.to_string()).collect())
        .collect();
    RawTable::from_records(headers, records)
}

fn spreadsheet_cell(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Empty => String::new(),
        DataType::Bool(b) => b.to_string(),
        DataType::Error(_) => String::new(),
        DataType::Float(n) | DataType::Duration(n) | DataType::DateTime(n) => n.to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::DateTimeIso(s) | DataType::DurationIso(s) => s.clone(),
    }
}

fn read_spreadsheet(path: &Path) -> Result<RawTable, HarmonizeError> {
    if io_utils::is_gzip(path) {
        return Err(HarmonizeError::unreadable(
            path,
            "compressed spreadsheets are not supported",
        ));
    }
    let mut workbook =
        open_workbook_auto(path).map_err(|err| HarmonizeError::unreadable(path, err))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| HarmonizeError::unreadable(path, "workbook has no worksheet"))?
        .map_err(|err| HarmonizeError::unreadable(path, err))?;
    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(row) => row.iter().map(spreadsheet_cell).collect::<Vec<_>>(),
        None => {
            warn!("First worksheet of {path:?} is empty");
            Vec::new()
        }
    };
    let records = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();
    Ok(RawTable::from_records(headers, records))
}
