//! Parse → diff → push → notify orchestration

use crate::change_detection::{DeltaTracker, DiffResult, DiffSummary};
use crate::data::DataProcessor;
use crate::error::Result;
use crate::notifier::Notifier;
use crate::progress::{ProgressReporter, SyncStage};
use crate::sheets::SheetWriter;
use crate::snapshot::SnapshotStore;
use crate::table::Table;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What one sync run did
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub source: PathBuf,
    pub stream: String,
    pub row_count: usize,
    pub summary: DiffSummary,
    #[serde(skip)]
    pub diff: DiffResult,
    pub changed: Table,
    pub sheet_url: Option<String>,
    pub notified: bool,
}

/// Runs files through the delta tracker and the configured sinks
pub struct SyncPipeline<S: SnapshotStore> {
    processor: DataProcessor,
    tracker: DeltaTracker<S>,
    sheet_writer: Option<Box<dyn SheetWriter>>,
    notifier: Option<Box<dyn Notifier>>,
    progress: ProgressReporter,
}

impl<S: SnapshotStore> SyncPipeline<S> {
    pub fn new(processor: DataProcessor, tracker: DeltaTracker<S>) -> Self {
        Self {
            processor,
            tracker,
            sheet_writer: None,
            notifier: None,
            progress: ProgressReporter::new_minimal(),
        }
    }

    pub fn with_sheet_writer(mut self, writer: Box<dyn SheetWriter>) -> Self {
        self.sheet_writer = Some(writer);
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn tracker(&self) -> &DeltaTracker<S> {
        &self.tracker
    }

    /// Parse a file and sync it
    pub fn run(&mut self, path: &Path) -> Result<SyncReport> {
        self.progress.reset();
        self.progress.start(SyncStage::Parse);
        let table = match self.processor.load_table(path) {
            Ok(table) => table,
            Err(e) => {
                self.progress.abandon(SyncStage::Parse);
                return Err(e);
            }
        };
        self.progress.finish(
            SyncStage::Parse,
            &format!("Parsed {} rows from {}", table.row_count(), path.display()),
        );

        self.run_table(path, &table)
    }

    /// Sync an already parsed table.
    ///
    /// The snapshot is committed before the sinks run, so a failed push
    /// still leaves the new snapshot in place.
    pub fn run_table(&mut self, source: &Path, table: &Table) -> Result<SyncReport> {
        self.progress.start(SyncStage::Diff);
        let diff = match self.tracker.compute_diff(table) {
            Ok(diff) => diff,
            Err(e) => {
                self.progress.abandon(SyncStage::Diff);
                return Err(e);
            }
        };
        let summary = diff.summary();
        self.progress
            .finish(SyncStage::Diff, &format!("Changes: {}", summary));

        let sheet_url = match &self.sheet_writer {
            Some(writer) => {
                self.progress.start(SyncStage::Push);
                match writer.push_table(table) {
                    Ok(url) => {
                        self.progress.finish(SyncStage::Push, &format!("Pushed to {}", url));
                        Some(url)
                    }
                    Err(e) => {
                        self.progress.abandon(SyncStage::Push);
                        return Err(e);
                    }
                }
            }
            None => {
                log::info!("Sheet push not configured, skipping");
                None
            }
        };

        let notified = match &self.notifier {
            Some(notifier) => {
                self.progress.start(SyncStage::Notify);
                let link = sheet_url
                    .clone()
                    .unwrap_or_else(|| source.display().to_string());
                let delivered = match notifier.post_summary(&summary, &link) {
                    Ok(delivered) => delivered,
                    Err(e) => {
                        log::warn!("Notification failed: {}", e);
                        false
                    }
                };
                if delivered {
                    self.progress.finish(SyncStage::Notify, "Notification sent");
                } else {
                    self.progress.abandon(SyncStage::Notify);
                }
                delivered
            }
            None => {
                log::info!("Notifications not configured, skipping");
                false
            }
        };

        Ok(SyncReport {
            source: source.to_path_buf(),
            stream: self.tracker.stream().to_string(),
            row_count: table.row_count(),
            summary,
            changed: diff.changed_table(),
            diff,
            sheet_url,
            notified,
        })
    }
}
