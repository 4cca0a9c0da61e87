use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{CleaningError, Result};

/// An ordered CSV table held fully in memory.
///
/// Cells stay the strings they arrived as; columns this step does not
/// understand pass through untouched and in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RecordTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Loads a delimited text file with a header row.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|cell| cell.to_string()).collect());
        }
        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Index of a named column. A missing required column is a hard error,
    /// not a filter miss.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CleaningError::MissingColumn(name.to_string()))
    }

    /// Parses a cell as a finite float. Anything else is `None`, so range
    /// predicates treat the row as out of range.
    pub fn numeric_cell(row: &[String], index: usize) -> Option<f64> {
        row.get(index)?
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
    }

    /// Keeps only rows the predicate accepts, preserving order. Returns the
    /// number of rows dropped.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&[String]) -> bool,
    {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row.as_slice()));
        before - self.rows.len()
    }

    /// Drops exact-duplicate rows, keeping the first occurrence. Row order
    /// stays contiguous. Returns the number of rows dropped.
    pub fn dedup_exact(&mut self) -> usize {
        let mut seen: HashSet<Vec<String>> = HashSet::with_capacity(self.rows.len());
        self.retain_rows(|row| seen.insert(row.to_vec()))
    }

    /// Serializes the table as CSV with a header row and no index column.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}
