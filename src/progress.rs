//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Stages of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Parse,
    Diff,
    Push,
    Notify,
}

impl SyncStage {
    fn message(&self) -> &'static str {
        match self {
            SyncStage::Parse => "Parsing file...",
            SyncStage::Diff => "Detecting changes...",
            SyncStage::Push => "Pushing to sheet...",
            SyncStage::Notify => "Sending notification...",
        }
    }
}

/// Progress reporter for sync runs
#[derive(Debug)]
pub struct ProgressReporter {
    pub parse_pb: Option<ProgressBar>,
    pub diff_pb: Option<ProgressBar>,
    pub push_pb: Option<ProgressBar>,
    pub notify_pb: Option<ProgressBar>,
    show_progress: bool,
    start_time: Instant,
}

impl ProgressReporter {
    /// Reporter that shows a spinner per stage
    pub fn new_for_sync() -> Self {
        Self::with_visibility(true)
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self::with_visibility(false)
    }

    fn with_visibility(show_progress: bool) -> Self {
        Self {
            parse_pb: None,
            diff_pb: None,
            push_pb: None,
            notify_pb: None,
            show_progress,
            start_time: Instant::now(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.show_progress
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn slot(&mut self, stage: SyncStage) -> &mut Option<ProgressBar> {
        match stage {
            SyncStage::Parse => &mut self.parse_pb,
            SyncStage::Diff => &mut self.diff_pb,
            SyncStage::Push => &mut self.push_pb,
            SyncStage::Notify => &mut self.notify_pb,
        }
    }

    /// Show the spinner for a stage
    pub fn start(&mut self, stage: SyncStage) {
        if !self.show_progress {
            return;
        }
        let slot = self.slot(stage);
        if slot.is_none() {
            *slot = Some(create_spinner(stage.message()));
        }
    }

    pub fn finish(&mut self, stage: SyncStage, message: &str) {
        if let Some(pb) = self.slot(stage).take() {
            pb.finish_with_message(message.to_string());
        }
    }

    /// Remove a stage's spinner without leaving a line behind
    pub fn abandon(&mut self, stage: SyncStage) {
        if let Some(pb) = self.slot(stage).take() {
            pb.finish_and_clear();
        }
    }

    /// Reset the clock and clear all spinners for the next run
    pub fn reset(&mut self) {
        for stage in [SyncStage::Parse, SyncStage::Diff, SyncStage::Push, SyncStage::Notify] {
            self.abandon(stage);
        }
        self.start_time = Instant::now();
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.reset();
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
