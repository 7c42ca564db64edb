//! # sheetsync
//!
//! Row-level change detection for CSV and Excel files. Each run is compared
//! against the last committed snapshot of its stream, the new table is pushed
//! to a spreadsheet, and a summary of the changes is posted to a webhook.

pub mod cli;
pub mod error;
pub mod logging;
pub mod config;
pub mod workspace;
pub mod table;
pub mod hash;
pub mod data;
pub mod snapshot;
pub mod change_detection;
pub mod sheets;
pub mod notifier;
pub mod pipeline;
pub mod watcher;
pub mod commands;
pub mod output;
pub mod progress;

pub use change_detection::{ChangeType, DeltaTracker, DiffResult, DiffSummary, RowUpdate, CHANGE_COLUMN};
pub use error::{Result, SheetSyncError};
pub use hash::IdentityKey;
pub use pipeline::{SyncPipeline, SyncReport};
pub use snapshot::{DuckDbSnapshotStore, MemorySnapshotStore, SnapshotStore};
pub use table::{Cell, Row, Table};
pub use workspace::SyncWorkspace;

/// Current format version for stored snapshots
pub const FORMAT_VERSION: &str = "1.0.0";

/// Stream used when none is configured
pub const DEFAULT_STREAM: &str = "default";

/// Snapshot database file name inside the workspace directory
pub const DEFAULT_DATABASE: &str = "delta.duckdb";
