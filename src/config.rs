//! Workspace configuration stored in `.sheetsync/config.json`

use crate::error::{Result, SheetSyncError};
use crate::hash::IdentityKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides `sheets.access_token`
pub const SHEETS_TOKEN_ENV: &str = "SHEETSYNC_SHEETS_TOKEN";
/// Environment variable that overrides `webhook.url`
pub const WEBHOOK_URL_ENV: &str = "SHEETSYNC_WEBHOOK_URL";

pub const DEFAULT_SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub version: String,
    pub created: Option<DateTime<Utc>>,
    pub sheets: SheetsSettings,
    pub webhook: WebhookSettings,
    pub watcher: WatcherSettings,
    pub delta: DeltaSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: crate::FORMAT_VERSION.to_string(),
            created: None,
            sheets: SheetsSettings::default(),
            webhook: WebhookSettings::default(),
            watcher: WatcherSettings::default(),
            delta: DeltaSettings::default(),
        }
    }
}

/// Target spreadsheet and credentials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsSettings {
    pub spreadsheet_id: Option<String>,
    pub worksheet_name: Option<String>,
    pub access_token: Option<String>,
    pub api_base: String,
}

impl Default for SheetsSettings {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            worksheet_name: None,
            access_token: None,
            api_base: DEFAULT_SHEETS_API_BASE.to_string(),
        }
    }
}

impl SheetsSettings {
    /// Whether a push can be attempted at all
    pub fn is_configured(&self) -> bool {
        self.spreadsheet_id.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Chat webhook for change summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookSettings {
    pub url: Option<String>,
    pub channel: String,
    pub username: String,
    pub icon_emoji: String,
}

impl Default for WebhookSettings {
    fn default() -> Self {
        Self {
            url: None,
            channel: "#general".to_string(),
            username: "Sheets-Bot".to_string(),
            icon_emoji: ":robot_face:".to_string(),
        }
    }
}

impl WebhookSettings {
    pub fn is_configured(&self) -> bool {
        self.url.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    pub folder: PathBuf,
    pub patterns: Vec<String>,
    pub poll_interval_secs: u64,
    pub debounce_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("./watch"),
            patterns: vec!["*.csv".to_string(), "*.xlsx".to_string()],
            poll_interval_secs: 5,
            debounce_ms: 1000,
        }
    }
}

impl WatcherSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Delta tracking options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaSettings {
    pub stream: String,
    pub key_columns: Vec<String>,
    /// Database file, relative to the workspace directory
    pub database: PathBuf,
}

impl Default for DeltaSettings {
    fn default() -> Self {
        Self {
            stream: crate::DEFAULT_STREAM.to_string(),
            key_columns: Vec::new(),
            database: PathBuf::from(crate::DEFAULT_DATABASE),
        }
    }
}

impl DeltaSettings {
    pub fn identity_key(&self) -> IdentityKey {
        IdentityKey::from_columns(self.key_columns.iter().cloned())
    }
}

impl Settings {
    /// Read settings from a JSON file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            SheetSyncError::config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Apply secrets from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply secrets from an arbitrary variable lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(SHEETS_TOKEN_ENV).filter(|v| !v.is_empty()) {
            self.sheets.access_token = Some(token);
        }
        if let Some(url) = lookup(WEBHOOK_URL_ENV).filter(|v| !v.is_empty()) {
            self.webhook.url = Some(url);
        }
        self
    }
}
