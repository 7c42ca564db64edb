//! Error types for sheetsync operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SheetSyncError>;

#[derive(Error, Debug)]
pub enum SheetSyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Snapshot storage error: {message}")]
    Storage { message: String },

    #[error("Malformed row: {message}")]
    MalformedRow { message: String },

    #[error("Unsupported file type: {extension}. Supported types: .csv, .xlsx, .xls")]
    UnsupportedFileType { extension: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Sheets push error: {message}")]
    SheetsPush { message: String },

    #[error("Notification error: {message}")]
    Notification { message: String },

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),
}

impl SheetSyncError {
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage {
            message: msg.into(),
        }
    }

    pub fn malformed_row(msg: impl Into<String>) -> Self {
        Self::MalformedRow {
            message: msg.into(),
        }
    }

    pub fn unsupported_file_type(extension: impl Into<String>) -> Self {
        Self::UnsupportedFileType {
            extension: extension.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn sheets_push(msg: impl Into<String>) -> Self {
        Self::SheetsPush {
            message: msg.into(),
        }
    }

    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification {
            message: msg.into(),
        }
    }

    /// Whether this error came from the snapshot store
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}
