//! Row fingerprinting for sheetsync delta tracking

use crate::table::Row;
use blake3::Hasher;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// A hash value represented as a hex string
pub type Fingerprint = String;

const FIELD_SEPARATOR: &[u8] = b"\x1f";
const RECORD_SEPARATOR: &[u8] = b"\x1e";

/// Columns used to match a deleted row to an added row as a probable update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKey {
    /// Identity is the full row content, so no add/delete pair ever matches
    #[default]
    AllColumns,
    Columns(Vec<String>),
}

impl IdentityKey {
    /// Key over the given columns; an empty list means all columns
    pub fn from_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            IdentityKey::AllColumns
        } else {
            IdentityKey::Columns(columns)
        }
    }

    /// Identity token of a row, or `None` if the row lacks a key column
    pub fn identity_of(&self, row: &Row, fingerprint: &str) -> Option<String> {
        match self {
            IdentityKey::AllColumns => Some(fingerprint.to_string()),
            IdentityKey::Columns(columns) => {
                let mut hasher = Hasher::new();
                for column in columns {
                    let cell = row.get(column)?;
                    hasher.update(column.as_bytes());
                    hasher.update(FIELD_SEPARATOR);
                    hasher.update(cell.canonical().as_bytes());
                    hasher.update(RECORD_SEPARATOR);
                }
                Some(hasher.finalize().to_hex().to_string())
            }
        }
    }

    /// Key columns missing from the given column list
    pub fn missing_columns<'a>(&'a self, columns: &[String]) -> Vec<&'a str> {
        match self {
            IdentityKey::AllColumns => Vec::new(),
            IdentityKey::Columns(key) => key
                .iter()
                .filter(|k| !columns.contains(k))
                .map(|k| k.as_str())
                .collect(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            IdentityKey::AllColumns => "all columns".to_string(),
            IdentityKey::Columns(columns) => columns.join(", "),
        }
    }
}

/// Computes content fingerprints for rows
#[derive(Debug, Clone, Copy, Default)]
pub struct RowHasher;

impl RowHasher {
    pub fn new() -> Self {
        Self
    }

    /// Fingerprint a row over all of its columns in sorted-name order
    pub fn fingerprint(&self, row: &Row) -> Fingerprint {
        let mut cells: Vec<(&String, String)> =
            row.iter().map(|(name, cell)| (name, cell.canonical())).collect();
        cells.sort_by(|a, b| a.0.cmp(b.0));

        let mut hasher = Hasher::new();
        for (name, value) in &cells {
            hasher.update(name.as_bytes());
            hasher.update(FIELD_SEPARATOR);
            hasher.update(value.as_bytes());
            hasher.update(RECORD_SEPARATOR);
        }
        hasher.finalize().to_hex().to_string()
    }

    /// Fingerprint rows in parallel, preserving input order
    pub fn fingerprint_rows(&self, rows: &[Row]) -> Vec<Fingerprint> {
        if rows.is_empty() {
            return Vec::new();
        }
        rows.par_iter().map(|row| self.fingerprint(row)).collect()
    }

    /// Compare two fingerprint sequences as multisets.
    ///
    /// Occurrences beyond the other side's count are reported as surplus,
    /// so two identical base rows against one current row yield one removal.
    pub fn compare_fingerprints(
        &self,
        base: &[Fingerprint],
        current: &[Fingerprint],
    ) -> FingerprintComparison {
        let base_counts = count_occurrences(base);
        let current_counts = count_occurrences(current);

        let removed = surplus_positions(base, &current_counts);
        let added = surplus_positions(current, &base_counts);

        FingerprintComparison {
            added,
            removed,
            total_base: base.len(),
            total_compare: current.len(),
            base_duplicates: base.len() - base_counts.len(),
            compare_duplicates: current.len() - current_counts.len(),
        }
    }
}

fn count_occurrences(hashes: &[Fingerprint]) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::with_capacity(hashes.len());
    for hash in hashes {
        *counts.entry(hash.as_str()).or_insert(0) += 1;
    }
    counts
}

fn surplus_positions(hashes: &[Fingerprint], other_counts: &HashMap<&str, usize>) -> Vec<usize> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut positions = Vec::new();
    for (position, hash) in hashes.iter().enumerate() {
        let occurrence = seen.entry(hash.as_str()).or_insert(0);
        *occurrence += 1;
        if *occurrence > other_counts.get(hash.as_str()).copied().unwrap_or(0) {
            positions.push(position);
        }
    }
    positions
}

/// Result of comparing two fingerprint multisets
#[derive(Debug, Clone)]
pub struct FingerprintComparison {
    /// Positions in the current sequence with no counterpart in the base
    pub added: Vec<usize>,
    /// Positions in the base sequence with no counterpart in the current
    pub removed: Vec<usize>,
    pub total_base: usize,
    pub total_compare: usize,
    pub base_duplicates: usize,
    pub compare_duplicates: usize,
}

impl FingerprintComparison {
    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}

/// FIFO index from identity token to candidate positions
#[derive(Debug, Default)]
pub(crate) struct IdentityIndex {
    slots: HashMap<String, VecDeque<usize>>,
}

impl IdentityIndex {
    pub(crate) fn insert(&mut self, identity: String, position: usize) {
        self.slots.entry(identity).or_default().push_back(position);
    }

    /// Take the earliest unclaimed position for an identity
    pub(crate) fn take(&mut self, identity: &str) -> Option<usize> {
        self.slots.get_mut(identity)?.pop_front()
    }
}
