//! Folder watching for new and modified tabular files

use crate::config::WatcherSettings;
use crate::error::{Result, SheetSyncError};
use glob::{MatchOptions, Pattern};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Drops repeat events for a path that arrive within the interval
#[derive(Debug)]
pub struct DebounceFilter {
    interval: Duration,
    last_seen: HashMap<PathBuf, Instant>,
}

impl DebounceFilter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_seen: HashMap::new(),
        }
    }

    /// Record an event at `now`; returns whether it should be handled
    pub fn should_process(&mut self, path: &Path, now: Instant) -> bool {
        match self.last_seen.get(path) {
            Some(last) if now.saturating_duration_since(*last) <= self.interval => false,
            _ => {
                self.last_seen.insert(path.to_path_buf(), now);
                true
            }
        }
    }
}

/// Watches one folder (non-recursively) for files matching glob patterns
pub struct FolderWatcher {
    folder: PathBuf,
    patterns: Vec<Pattern>,
    poll_interval: Duration,
    debounce: Duration,
    watcher: Option<RecommendedWatcher>,
}

impl FolderWatcher {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        let defaults = WatcherSettings::default();
        Self {
            folder: folder.into(),
            patterns: compile_patterns(defaults.patterns.as_slice()).unwrap_or_default(),
            poll_interval: defaults.poll_interval(),
            debounce: defaults.debounce(),
            watcher: None,
        }
    }

    /// Build from settings, watching `folder` (already resolved by the caller)
    pub fn from_settings(settings: &WatcherSettings, folder: PathBuf) -> Result<Self> {
        Ok(Self::new(folder)
            .with_patterns(settings.patterns.as_slice())?
            .with_poll_interval(settings.poll_interval())
            .with_debounce(settings.debounce()))
    }

    pub fn with_patterns<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.patterns = compile_patterns(patterns)?;
        Ok(self)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn patterns(&self) -> Vec<&str> {
        self.patterns.iter().map(Pattern::as_str).collect()
    }

    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// Whether the file name matches any pattern, ignoring case
    pub fn matches(&self, path: &Path) -> bool {
        matches_patterns(&self.patterns, path)
    }

    /// Matching files already in the folder, sorted by name
    pub fn existing_files(&self) -> Result<Vec<PathBuf>> {
        if !self.folder.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.folder)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if entry.file_type().is_file() && self.matches(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Start watching; matching created or modified files arrive on the receiver
    pub fn start(&mut self) -> Result<Receiver<PathBuf>> {
        if self.is_running() {
            return Err(SheetSyncError::invalid_input("Watcher is already running"));
        }

        std::fs::create_dir_all(&self.folder)?;

        let (tx, rx) = channel();
        let patterns = self.patterns.clone();
        let mut debounce = DebounceFilter::new(self.debounce);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        return;
                    }
                    for path in event.paths {
                        if path.is_dir() || !matches_patterns(&patterns, &path) {
                            continue;
                        }
                        if debounce.should_process(&path, Instant::now()) {
                            let resolved = path.canonicalize().unwrap_or(path);
                            log::debug!("File event: {}", resolved.display());
                            let _ = tx.send(resolved);
                        }
                    }
                }
                Err(e) => log::warn!("Watch error: {}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;

        watcher.watch(&self.folder, RecursiveMode::NonRecursive)?;
        self.watcher = Some(watcher);

        log::info!(
            "Watching {} for {}",
            self.folder.display(),
            self.patterns().join(", ")
        );
        Ok(rx)
    }

    /// Stop watching. Calling this on a stopped watcher does nothing.
    pub fn stop(&mut self) {
        if self.watcher.take().is_some() {
            log::info!("Stopped watching {}", self.folder.display());
        }
    }
}

impl Drop for FolderWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn compile_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p.as_ref()).map_err(|e| {
                SheetSyncError::config(format!("Invalid watch pattern '{}': {}", p.as_ref(), e))
            })
        })
        .collect()
}

fn matches_patterns(patterns: &[Pattern], path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    patterns.iter().any(|p| p.matches_with(name, MATCH_OPTIONS))
}
