//! Row-level change detection between a new table and the last committed snapshot

use crate::error::Result;
use crate::hash::{IdentityIndex, IdentityKey, RowHasher};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::table::{Cell, Row, Table};
use crate::DEFAULT_STREAM;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the leading column in [`DiffResult::changed_table`]
pub const CHANGE_COLUMN: &str = "_change";

/// Kind of change a row went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Updated,
    Deleted,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Updated => "updated",
            ChangeType::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cell change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellChange {
    pub before: Cell,
    pub after: Cell,
}

/// An old row paired with the new row that replaced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowUpdate {
    pub before: Row,
    pub after: Row,
    pub changes: IndexMap<String, CellChange>,
}

impl RowUpdate {
    /// Pair two rows and record every column whose value differs.
    /// A column present on only one side always counts, even when empty.
    pub fn between(before: Row, after: Row) -> Self {
        let mut changes = IndexMap::new();

        for (column, new_cell) in &after {
            match before.get(column) {
                Some(old_cell) if old_cell.same_value(new_cell) => {}
                old_cell => {
                    changes.insert(
                        column.clone(),
                        CellChange {
                            before: old_cell.cloned().unwrap_or(Cell::Empty),
                            after: new_cell.clone(),
                        },
                    );
                }
            }
        }

        for (column, old_cell) in &before {
            if !after.contains_key(column) {
                changes.insert(
                    column.clone(),
                    CellChange {
                        before: old_cell.clone(),
                        after: Cell::Empty,
                    },
                );
            }
        }

        Self {
            before,
            after,
            changes,
        }
    }
}

/// Columns that appeared or disappeared since the last snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaChanges {
    pub columns_added: Vec<String>,
    pub columns_removed: Vec<String>,
}

impl SchemaChanges {
    fn between(old: &[String], new: &[String]) -> Self {
        Self {
            columns_added: new.iter().filter(|c| !old.contains(c)).cloned().collect(),
            columns_removed: old.iter().filter(|c| !new.contains(c)).cloned().collect(),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.columns_added.is_empty() || !self.columns_removed.is_empty()
    }
}

/// Change counts for one diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
}

impl DiffSummary {
    pub fn total(&self) -> usize {
        self.added + self.updated + self.deleted
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{} / {} / {}", self.added, self.updated, self.deleted)
    }
}

/// A changed row tagged with how it changed
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedRow<'a> {
    pub change: ChangeType,
    pub row: &'a Row,
}

/// Outcome of comparing a table against the stored snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffResult {
    /// New table columns followed by columns only the old snapshot had
    pub columns: Vec<String>,
    pub added: Vec<Row>,
    pub updated: Vec<RowUpdate>,
    pub deleted: Vec<Row>,
    pub schema: SchemaChanges,
}

impl DiffResult {
    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn updated_count(&self) -> usize {
        self.updated.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            added: self.added.len(),
            updated: self.updated.len(),
            deleted: self.deleted.len(),
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.summary().is_empty()
    }

    pub fn total_changes(&self) -> usize {
        self.summary().total()
    }

    /// Added, then updated (new content), then deleted rows
    pub fn changed_rows(&self) -> Vec<ChangedRow<'_>> {
        let added = self.added.iter().map(|row| ChangedRow {
            change: ChangeType::Added,
            row,
        });
        let updated = self.updated.iter().map(|update| ChangedRow {
            change: ChangeType::Updated,
            row: &update.after,
        });
        let deleted = self.deleted.iter().map(|row| ChangedRow {
            change: ChangeType::Deleted,
            row,
        });
        added.chain(updated).chain(deleted).collect()
    }

    /// Changed rows as a table with a leading change-type column
    pub fn changed_table(&self) -> Table {
        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(CHANGE_COLUMN.to_string());
        columns.extend(self.columns.iter().filter(|c| *c != CHANGE_COLUMN).cloned());

        let rows = self
            .changed_rows()
            .into_iter()
            .map(|changed| {
                let mut out = Row::with_capacity(columns.len());
                out.insert(CHANGE_COLUMN.to_string(), Cell::Text(changed.change.to_string()));
                for column in columns.iter().skip(1) {
                    let cell = changed.row.get(column).cloned().unwrap_or(Cell::Empty);
                    out.insert(column.clone(), cell);
                }
                out
            })
            .collect();

        Table { columns, rows }
    }
}

/// Computes diffs for one stream and keeps its snapshot current
pub struct DeltaTracker<S: SnapshotStore> {
    store: S,
    stream: String,
    key: IdentityKey,
    hasher: RowHasher,
}

impl<S: SnapshotStore> DeltaTracker<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            stream: DEFAULT_STREAM.to_string(),
            key: IdentityKey::default(),
            hasher: RowHasher::new(),
        }
    }

    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = stream.into();
        self
    }

    pub fn with_identity_key(mut self, key: IdentityKey) -> Self {
        self.key = key;
        self
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn identity_key(&self) -> &IdentityKey {
        &self.key
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Forget the stream's snapshot
    pub fn reset(&mut self) -> Result<bool> {
        self.store.clear(&self.stream)
    }

    /// Diff `new_table` against the stored snapshot, then commit it.
    ///
    /// Rows are compared as multisets of fingerprints. A deleted row and an
    /// added row with the same identity are reported as one update. Nothing
    /// is written if the table is malformed or the store fails to load.
    pub fn compute_diff(&mut self, new_table: &Table) -> Result<DiffResult> {
        new_table.validate()?;

        let old = self.store.load(&self.stream)?;

        if !new_table.is_empty() {
            let missing = self.key.missing_columns(&new_table.columns);
            if !missing.is_empty() {
                log::warn!(
                    "Identity key columns missing from table: {}. Rows will not be matched as updates.",
                    missing.join(", ")
                );
            }
        }

        let new_fingerprints = self.hasher.fingerprint_rows(&new_table.rows);
        let old_fingerprints = old.fingerprints();
        let comparison = self
            .hasher
            .compare_fingerprints(&old_fingerprints, &new_fingerprints);

        log::debug!(
            "Stream '{}': {} old rows ({} duplicates), {} new rows ({} duplicates), {} raw changes",
            self.stream,
            comparison.total_base,
            comparison.base_duplicates,
            comparison.total_compare,
            comparison.compare_duplicates,
            comparison.total_changes()
        );

        let mut candidates = IdentityIndex::default();
        for &position in &comparison.added {
            if let Some(identity) = self
                .key
                .identity_of(&new_table.rows[position], &new_fingerprints[position])
            {
                candidates.insert(identity, position);
            }
        }

        let mut paired = vec![false; new_table.rows.len()];
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        let mut deleted = Vec::new();

        for &old_position in &comparison.removed {
            let stored = &old.rows[old_position];
            let matched = self
                .key
                .identity_of(&stored.content, &stored.fingerprint)
                .and_then(|identity| candidates.take(&identity));

            match matched {
                Some(new_position) => {
                    paired[new_position] = true;
                    pairs.push((new_position, old_position));
                }
                None => deleted.push(stored.content.clone()),
            }
        }

        pairs.sort_by_key(|(new_position, _)| *new_position);

        let added = comparison
            .added
            .iter()
            .filter(|&&position| !paired[position])
            .map(|&position| new_table.rows[position].clone())
            .collect();

        let updated = pairs
            .into_iter()
            .map(|(new_position, old_position)| {
                RowUpdate::between(
                    old.rows[old_position].content.clone(),
                    new_table.rows[new_position].clone(),
                )
            })
            .collect();

        let schema = if old.committed_at.is_some() {
            SchemaChanges::between(&old.columns, &new_table.columns)
        } else {
            SchemaChanges::default()
        };

        let mut columns = new_table.columns.clone();
        columns.extend(
            old.columns
                .iter()
                .filter(|c| !new_table.columns.contains(c))
                .cloned(),
        );

        let snapshot = Snapshot::from_parts(new_table, new_fingerprints, &self.key);
        self.store.commit(&self.stream, &snapshot)?;

        let result = DiffResult {
            columns,
            added,
            updated,
            deleted,
            schema,
        };

        log::info!(
            "Stream '{}' changes: {}",
            self.stream,
            result.summary()
        );

        Ok(result)
    }
}
