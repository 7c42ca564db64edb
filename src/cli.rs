//! Command-line interface for sheetsync

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sheetsync")]
#[command(about = "Sync tabular files to a spreadsheet with row-level change tracking")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override workspace location
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize sheetsync workspace
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Parse a file and print the cleaned table
    Parse {
        /// CSV or Excel file
        file: PathBuf,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,

        /// Worksheet to read from Excel files (defaults to the first)
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Detect changes in a file, push it and notify
    Sync {
        /// CSV or Excel file
        file: PathBuf,

        /// Stream to track changes under (defaults to config)
        #[arg(long)]
        stream: Option<String>,

        /// Identity key column used to pair updates (repeatable)
        #[arg(long = "key")]
        key: Vec<String>,

        /// Skip pushing to the sheet
        #[arg(long)]
        no_push: bool,

        /// Skip the webhook notification
        #[arg(long)]
        no_notify: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Watch a folder and sync files as they appear
    Watch {
        /// Folder to watch (defaults to config)
        #[arg(long)]
        folder: Option<PathBuf>,

        /// File pattern to match (repeatable, defaults to config)
        #[arg(long = "pattern")]
        pattern: Vec<String>,

        /// Process existing files and exit
        #[arg(long)]
        once: bool,

        /// Skip pushing to the sheet
        #[arg(long)]
        no_push: bool,

        /// Skip the webhook notification
        #[arg(long)]
        no_notify: bool,
    },

    /// Show tracked streams or one stream's snapshot
    Show {
        /// Stream to display (lists all streams if omitted)
        #[arg(long)]
        stream: Option<String>,

        /// Include the stored rows
        #[arg(long)]
        rows: bool,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,
    },

    /// Forget a stream's snapshot so the next sync treats all rows as added
    Reset {
        /// Stream to clear (defaults to config)
        #[arg(long)]
        stream: Option<String>,
    },
}

/// Parse output format string
#[derive(Debug, Clone, PartialEq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}
