//! Persistent snapshot storage for delta tracking

use crate::error::{Result, SheetSyncError};
use crate::hash::{Fingerprint, IdentityKey, RowHasher};
use crate::table::{Row, Table};
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A row as it is kept in the snapshot store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRow {
    pub fingerprint: Fingerprint,
    pub identity_key: String,
    pub content: Row,
}

/// The committed state of one stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub columns: Vec<String>,
    pub rows: Vec<StoredRow>,
    pub committed_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Fingerprint every row of a table into a snapshot
    pub fn from_table(table: &Table, key: &IdentityKey) -> Result<Self> {
        table.validate()?;
        let hasher = RowHasher::new();
        let fingerprints = hasher.fingerprint_rows(&table.rows);
        Ok(Self::from_parts(table, fingerprints, key))
    }

    /// Assemble a snapshot from a table and its precomputed fingerprints
    pub(crate) fn from_parts(table: &Table, fingerprints: Vec<Fingerprint>, key: &IdentityKey) -> Self {
        let rows = table
            .rows
            .iter()
            .zip(fingerprints)
            .map(|(content, fingerprint)| StoredRow {
                identity_key: key.identity_of(content, &fingerprint).unwrap_or_default(),
                fingerprint,
                content: content.clone(),
            })
            .collect();

        Self {
            columns: table.columns.clone(),
            rows,
            committed_at: Some(Utc::now()),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.rows.iter().map(|r| r.fingerprint.clone()).collect()
    }

    /// Rebuild the committed table
    pub fn to_table(&self) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().map(|r| r.content.clone()).collect(),
        }
    }
}

/// Summary of a committed stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub stream_id: String,
    pub row_count: u64,
    pub column_count: usize,
    pub committed_at: Option<DateTime<Utc>>,
}

/// Durable keyed storage of the latest snapshot per stream
pub trait SnapshotStore {
    /// Last committed snapshot, or an empty one if the stream is unknown
    fn load(&self, stream_id: &str) -> Result<Snapshot>;

    /// Replace the stream's snapshot entirely, or leave it untouched on failure
    fn commit(&mut self, stream_id: &str, snapshot: &Snapshot) -> Result<()>;

    /// All committed streams
    fn streams(&self) -> Result<Vec<StreamInfo>>;

    /// Forget a stream; returns whether anything was stored
    fn clear(&mut self, stream_id: &str) -> Result<bool>;

    /// Fingerprint a table and commit it as the stream's snapshot
    fn commit_table(&mut self, stream_id: &str, table: &Table, key: &IdentityKey) -> Result<Snapshot> {
        let snapshot = Snapshot::from_table(table, key)?;
        self.commit(stream_id, &snapshot)?;
        Ok(snapshot)
    }
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Box<S> {
    fn load(&self, stream_id: &str) -> Result<Snapshot> {
        (**self).load(stream_id)
    }

    fn commit(&mut self, stream_id: &str, snapshot: &Snapshot) -> Result<()> {
        (**self).commit(stream_id, snapshot)
    }

    fn streams(&self) -> Result<Vec<StreamInfo>> {
        (**self).streams()
    }

    fn clear(&mut self, stream_id: &str) -> Result<bool> {
        (**self).clear(stream_id)
    }
}

const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS snapshot_rows (
        stream_id VARCHAR NOT NULL,
        row_position BIGINT NOT NULL,
        fingerprint VARCHAR NOT NULL,
        identity_key VARCHAR NOT NULL,
        content VARCHAR NOT NULL
    );
    CREATE TABLE IF NOT EXISTS snapshot_streams (
        stream_id VARCHAR PRIMARY KEY,
        format_version VARCHAR NOT NULL,
        columns VARCHAR NOT NULL,
        row_count BIGINT NOT NULL,
        committed_at VARCHAR NOT NULL
    );
";

/// Snapshot store backed by a DuckDB database file
pub struct DuckDbSnapshotStore {
    connection: Connection,
    path: Option<PathBuf>,
}

impl DuckDbSnapshotStore {
    /// Open (creating if needed) the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SheetSyncError::storage(format!(
                        "Failed to create snapshot directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let connection = Connection::open(path).map_err(|e| {
            SheetSyncError::storage(format!(
                "Failed to open snapshot database {}: {}",
                path.display(),
                e
            ))
        })?;

        let store = Self {
            connection,
            path: Some(path.to_path_buf()),
        };
        store.ensure_schema()?;
        log::debug!("Opened snapshot database at {}", path.display());
        Ok(store)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().map_err(|e| {
            SheetSyncError::storage(format!("Failed to open in-memory snapshot database: {}", e))
        })?;
        let store = Self { connection, path: None };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn ensure_schema(&self) -> Result<()> {
        self.connection
            .execute_batch(SCHEMA_SQL)
            .map_err(|e| SheetSyncError::storage(format!("Failed to initialize snapshot schema: {}", e)))
    }

    fn load_columns(&self, stream_id: &str) -> Result<Option<(Vec<String>, Option<DateTime<Utc>>)>> {
        let mut stmt = self
            .connection
            .prepare("SELECT columns, committed_at FROM snapshot_streams WHERE stream_id = ?")
            .map_err(|e| SheetSyncError::storage(format!("Failed to prepare stream query: {}", e)))?;

        let mut rows = stmt
            .query_map(params![stream_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| SheetSyncError::storage(format!("Failed to query stream '{}': {}", stream_id, e)))?;

        let Some(record) = rows.next() else {
            return Ok(None);
        };
        let (columns_json, committed_at) = record
            .map_err(|e| SheetSyncError::storage(format!("Failed to read stream '{}': {}", stream_id, e)))?;

        let columns: Vec<String> = serde_json::from_str(&columns_json).map_err(|e| {
            SheetSyncError::storage(format!("Corrupt column list for stream '{}': {}", stream_id, e))
        })?;

        Ok(Some((columns, parse_timestamp(&committed_at))))
    }
}

impl SnapshotStore for DuckDbSnapshotStore {
    fn load(&self, stream_id: &str) -> Result<Snapshot> {
        let Some((columns, committed_at)) = self.load_columns(stream_id)? else {
            log::debug!("No snapshot stored for stream '{}'", stream_id);
            return Ok(Snapshot::empty());
        };

        let mut stmt = self
            .connection
            .prepare(
                "SELECT fingerprint, identity_key, content FROM snapshot_rows \
                 WHERE stream_id = ? ORDER BY row_position",
            )
            .map_err(|e| SheetSyncError::storage(format!("Failed to prepare snapshot query: {}", e)))?;

        let records = stmt
            .query_map(params![stream_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| SheetSyncError::storage(format!("Failed to load snapshot '{}': {}", stream_id, e)))?;

        let mut rows = Vec::new();
        for record in records {
            let (fingerprint, identity_key, content) = record.map_err(|e| {
                SheetSyncError::storage(format!("Failed to read snapshot row: {}", e))
            })?;
            let content: Row = serde_json::from_str(&content).map_err(|e| {
                SheetSyncError::storage(format!(
                    "Corrupt snapshot row {} in stream '{}': {}",
                    fingerprint, stream_id, e
                ))
            })?;
            rows.push(StoredRow {
                fingerprint,
                identity_key,
                content,
            });
        }

        log::debug!("Loaded {} rows for stream '{}'", rows.len(), stream_id);

        Ok(Snapshot {
            columns,
            rows,
            committed_at,
        })
    }

    fn commit(&mut self, stream_id: &str, snapshot: &Snapshot) -> Result<()> {
        let columns_json = serde_json::to_string(&snapshot.columns)?;
        let committed_at = snapshot.committed_at.unwrap_or_else(Utc::now).to_rfc3339();

        let mut contents = Vec::with_capacity(snapshot.rows.len());
        for row in &snapshot.rows {
            contents.push(serde_json::to_string(&row.content)?);
        }

        let tx = self
            .connection
            .transaction()
            .map_err(|e| SheetSyncError::storage(format!("Failed to begin snapshot transaction: {}", e)))?;

        tx.execute("DELETE FROM snapshot_rows WHERE stream_id = ?", params![stream_id])
            .map_err(|e| SheetSyncError::storage(format!("Failed to clear snapshot '{}': {}", stream_id, e)))?;

        {
            let mut insert = tx
                .prepare(
                    "INSERT INTO snapshot_rows \
                     (stream_id, row_position, fingerprint, identity_key, content) \
                     VALUES (?, ?, ?, ?, ?)",
                )
                .map_err(|e| SheetSyncError::storage(format!("Failed to prepare row insert: {}", e)))?;

            for (position, (row, content)) in snapshot.rows.iter().zip(&contents).enumerate() {
                insert
                    .execute(params![
                        stream_id,
                        position as i64,
                        row.fingerprint,
                        row.identity_key,
                        content
                    ])
                    .map_err(|e| SheetSyncError::storage(format!("Failed to store snapshot row: {}", e)))?;
            }
        }

        tx.execute("DELETE FROM snapshot_streams WHERE stream_id = ?", params![stream_id])
            .map_err(|e| SheetSyncError::storage(format!("Failed to replace stream record: {}", e)))?;
        tx.execute(
            "INSERT INTO snapshot_streams \
             (stream_id, format_version, columns, row_count, committed_at) \
             VALUES (?, ?, ?, ?, ?)",
            params![
                stream_id,
                crate::FORMAT_VERSION,
                columns_json,
                snapshot.rows.len() as i64,
                committed_at
            ],
        )
        .map_err(|e| SheetSyncError::storage(format!("Failed to store stream record: {}", e)))?;

        tx.commit()
            .map_err(|e| SheetSyncError::storage(format!("Failed to commit snapshot '{}': {}", stream_id, e)))?;

        log::debug!("Committed {} rows to stream '{}'", snapshot.rows.len(), stream_id);
        Ok(())
    }

    fn streams(&self) -> Result<Vec<StreamInfo>> {
        let mut stmt = self
            .connection
            .prepare("SELECT stream_id, columns, row_count, committed_at FROM snapshot_streams ORDER BY stream_id")
            .map_err(|e| SheetSyncError::storage(format!("Failed to prepare stream listing: {}", e)))?;

        let records = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| SheetSyncError::storage(format!("Failed to list streams: {}", e)))?;

        let mut streams = Vec::new();
        for record in records {
            let (stream_id, columns_json, row_count, committed_at) =
                record.map_err(|e| SheetSyncError::storage(format!("Failed to read stream record: {}", e)))?;
            let columns: Vec<String> = serde_json::from_str(&columns_json).map_err(|e| {
                SheetSyncError::storage(format!("Corrupt column list for stream '{}': {}", stream_id, e))
            })?;
            streams.push(StreamInfo {
                stream_id,
                row_count: row_count.max(0) as u64,
                column_count: columns.len(),
                committed_at: parse_timestamp(&committed_at),
            });
        }
        Ok(streams)
    }

    fn clear(&mut self, stream_id: &str) -> Result<bool> {
        let tx = self
            .connection
            .transaction()
            .map_err(|e| SheetSyncError::storage(format!("Failed to begin snapshot transaction: {}", e)))?;

        tx.execute("DELETE FROM snapshot_rows WHERE stream_id = ?", params![stream_id])
            .map_err(|e| SheetSyncError::storage(format!("Failed to clear snapshot '{}': {}", stream_id, e)))?;
        let removed = tx
            .execute("DELETE FROM snapshot_streams WHERE stream_id = ?", params![stream_id])
            .map_err(|e| SheetSyncError::storage(format!("Failed to clear stream '{}': {}", stream_id, e)))?;

        tx.commit()
            .map_err(|e| SheetSyncError::storage(format!("Failed to commit clear of '{}': {}", stream_id, e)))?;

        Ok(removed > 0)
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// In-process snapshot store, mainly for tests
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: HashMap<String, Snapshot>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load(&self, stream_id: &str) -> Result<Snapshot> {
        Ok(self.snapshots.get(stream_id).cloned().unwrap_or_default())
    }

    fn commit(&mut self, stream_id: &str, snapshot: &Snapshot) -> Result<()> {
        let mut stored = snapshot.clone();
        stored.committed_at.get_or_insert_with(Utc::now);
        self.snapshots.insert(stream_id.to_string(), stored);
        Ok(())
    }

    fn streams(&self) -> Result<Vec<StreamInfo>> {
        let mut streams: Vec<StreamInfo> = self
            .snapshots
            .iter()
            .map(|(id, snapshot)| StreamInfo {
                stream_id: id.clone(),
                row_count: snapshot.rows.len() as u64,
                column_count: snapshot.columns.len(),
                committed_at: snapshot.committed_at,
            })
            .collect();
        streams.sort_by(|a, b| a.stream_id.cmp(&b.stream_id));
        Ok(streams)
    }

    fn clear(&mut self, stream_id: &str) -> Result<bool> {
        Ok(self.snapshots.remove(stream_id).is_some())
    }
}
