//! Aligned plain-text tables for terminal reports.

use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Right,
}

#[derive(Debug, Clone, Default)]
pub struct TextTable {
    headers: Vec<String>,
    aligns: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers = headers.into_iter().map(Into::into).collect::<Vec<String>>();
        let aligns = vec![Align::Left; headers.len()];
        Self {
            headers,
            aligns,
            rows: Vec::new(),
        }
    }

    /// Right-aligns the given columns; out-of-range indices are ignored.
    pub fn right_align(mut self, columns: &[usize]) -> Self {
        for idx in columns {
            if let Some(align) = self.aligns.get_mut(*idx) {
                *align = Align::Right;
            }
        }
        self
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut widths = self
            .headers
            .iter()
            .map(|h| cell_width(h).max(3))
            .collect::<Vec<_>>();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell_width(cell));
            }
        }

        let mut out = String::new();
        let _ = writeln!(out, "{}", self.line(&self.headers, &widths));
        let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
        let _ = writeln!(out, "{}", self.line(&rule, &widths));
        for row in &self.rows {
            let _ = writeln!(out, "{}", self.line(row, &widths));
        }
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }

    fn line(&self, cells: &[String], widths: &[usize]) -> String {
        let rendered = widths
            .iter()
            .enumerate()
            .map(|(idx, width)| {
                let cell = cells.get(idx).map(|c| flatten(c)).unwrap_or_default();
                let pad = " ".repeat(width.saturating_sub(cell_width(&cell)));
                match self.aligns.get(idx).copied().unwrap_or_default() {
                    Align::Left => format!("{cell}{pad}"),
                    Align::Right => format!("{pad}{cell}"),
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        rendered.trim_end().to_string()
    }
}

fn cell_width(value: &str) -> usize {
    value.chars().count()
}

/// Control characters would break the grid.
fn flatten(value: &str) -> String {
    value
        .chars()
        .map(|ch| if ch.is_control() { ' ' } else { ch })
        .collect()
}
