//! Tabular data model shared by the parser, the delta engine and the sinks

use crate::error::{Result, SheetSyncError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Canonical string used for empty cells when hashing
pub const EMPTY_SENTINEL: &str = "\u{0}";

/// A single scalar cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Build a text cell, trimming whitespace. Blank text becomes `Empty`.
    pub fn text(value: impl AsRef<str>) -> Self {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    /// Build a float cell. NaN becomes `Empty`.
    pub fn float(value: f64) -> Self {
        if value.is_nan() {
            Cell::Empty
        } else {
            Cell::Float(value)
        }
    }

    /// Infer a typed cell from raw text the way a CSV reader would
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Cell::Integer(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() {
                return Cell::Float(f);
            }
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Cell::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Cell::Bool(false);
        }
        Cell::Text(trimmed.to_string())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Normalized string representation used for hashing and comparison
    pub fn canonical(&self) -> String {
        match self {
            Cell::Empty => EMPTY_SENTINEL.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Integer(i) => i.to_string(),
            Cell::Float(f) if f.is_nan() => EMPTY_SENTINEL.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }

    /// Whether two cells hold the same value after normalization
    pub fn same_value(&self, other: &Cell) -> bool {
        self.canonical() == other.canonical()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Float(v) if v.is_nan() => Ok(()),
            other => write!(f, "{}", other.canonical()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::text(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

impl From<i32> for Cell {
    fn from(value: i32) -> Self {
        Cell::Integer(value as i64)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::float(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

/// An ordered mapping from column name to cell
pub type Row = IndexMap<String, Cell>;

/// Build a row from `(column, value)` pairs
pub fn row<K, V, I>(cells: I) -> Row
where
    K: Into<String>,
    V: Into<Cell>,
    I: IntoIterator<Item = (K, V)>,
{
    cells
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A rectangular table: a column list and rows that all carry those columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Create a validated table
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        let table = Self { columns, rows };
        table.validate()?;
        Ok(table)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from rows, taking the column order from the first row
    pub fn from_rows(rows: Vec<Row>) -> Result<Self> {
        let columns = rows
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        Self::new(columns, rows)
    }

    /// Build a table from a header and positional records
    pub fn from_records(columns: Vec<String>, records: Vec<Vec<Cell>>) -> Result<Self> {
        let mut rows = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            if record.len() != columns.len() {
                return Err(SheetSyncError::malformed_row(format!(
                    "row {} has {} cells but the table has {} columns",
                    index,
                    record.len(),
                    columns.len()
                )));
            }
            rows.push(columns.iter().cloned().zip(record).collect());
        }
        Self::new(columns, rows)
    }

    /// Check that column names are unique and every row carries exactly them
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.columns.len());
        for column in &self.columns {
            if !seen.insert(column.as_str()) {
                return Err(SheetSyncError::malformed_row(format!(
                    "duplicate column name '{}'",
                    column
                )));
            }
        }

        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len()
                || !row.keys().all(|k| seen.contains(k.as_str()))
            {
                let names: Vec<&str> = row.keys().map(|k| k.as_str()).collect();
                return Err(SheetSyncError::malformed_row(format!(
                    "row {} has columns [{}], expected [{}]",
                    index,
                    names.join(", "),
                    self.columns.join(", ")
                )));
            }
        }

        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cells of a row in the table's declared column order
    pub fn record(&self, index: usize) -> Option<Vec<&Cell>> {
        let row = self.rows.get(index)?;
        Some(
            self.columns
                .iter()
                .map(|c| row.get(c).unwrap_or(&Cell::Empty))
                .collect(),
        )
    }
}
