//! Raw tabular data and its CSV edge
//!
//! A [`Table`] holds a CSV file as-is: ordered headers plus string
//! cells. Parsing and typing happen downstream in the normalizers.

use crate::{PipelineError, Result};
use std::path::Path;

/// True for cells that mean "no observation": empty or an NA marker.
pub fn is_missing(cell: &str) -> bool {
    let s = cell.trim();
    s.is_empty()
        || s.eq_ignore_ascii_case("na")
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("null")
}

/// An untyped table: header row plus string cells, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Table {
            headers,
            rows: Vec::new(),
        }
    }

    /// Read a CSV file. Headers are trimmed; short rows are padded with
    /// empty cells and long rows truncated to the header width.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path.as_ref())?;

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let width = headers.len();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(str::to_string).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Table { headers, rows })
    }

    /// Write the table as CSV, creating parent directories as needed.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows (excluding the header)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Column index or a `MissingColumn` error naming the table.
    pub fn require_column(&self, name: &str, table: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| PipelineError::MissingColumn {
                table: table.to_string(),
                column: name.to_string(),
            })
    }

    pub fn value(&self, row: usize, col: usize) -> &str {
        &self.rows[row][col]
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    /// Append a column; `values` must have one entry per row.
    pub fn push_column(&mut self, name: String, values: Vec<String>) {
        debug_assert_eq!(values.len(), self.rows.len());
        self.headers.push(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
    }

    /// Reorder rows by `order` (a permutation of row indices).
    pub fn reorder_rows(&mut self, order: &[usize]) {
        debug_assert_eq!(order.len(), self.rows.len());
        let old = std::mem::take(&mut self.rows);
        let mut slots: Vec<Option<Vec<String>>> = old.into_iter().map(Some).collect();
        self.rows = order
            .iter()
            .map(|&i| slots[i].take().unwrap_or_default())
            .collect();
    }
}
