//! Workspace management for sheetsync operations

use crate::config::Settings;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Manages the .sheetsync workspace directory
#[derive(Debug, Clone)]
pub struct SyncWorkspace {
    /// Project root directory (where .sheetsync/ lives)
    pub root: PathBuf,
    /// .sheetsync/ directory path
    pub sheetsync_dir: PathBuf,
}

impl SyncWorkspace {
    /// Find existing workspace or create a new one
    pub fn find_or_create(start_dir: Option<&Path>) -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        let start = start_dir.unwrap_or(&current_dir);

        if let Some(workspace) = Self::find_existing(start)? {
            return Ok(workspace);
        }

        Self::create_new(start.to_path_buf())
    }

    /// Find existing .sheetsync workspace by walking up directory tree
    pub fn find_existing(start_dir: &Path) -> Result<Option<Self>> {
        let mut current = start_dir;

        loop {
            let sheetsync_dir = current.join(".sheetsync");
            if sheetsync_dir.is_dir() {
                return Ok(Some(Self::from_root(current.to_path_buf())));
            }

            // A git root bounds the search
            if current.join(".git").exists() {
                break;
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Ok(None)
    }

    /// Create a new workspace in the specified root directory
    pub fn create_new(root: PathBuf) -> Result<Self> {
        let workspace = Self::from_root(root);

        fs::create_dir_all(&workspace.sheetsync_dir)?;
        workspace.create_config_with_force(false)?;
        workspace.ensure_gitignore()?;

        log::info!("Created sheetsync workspace at: {}", workspace.root.display());

        Ok(workspace)
    }

    /// Create workspace from root directory path
    pub fn from_root(root: PathBuf) -> Self {
        let sheetsync_dir = root.join(".sheetsync");
        Self {
            root,
            sheetsync_dir,
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.sheetsync_dir.join("config.json")
    }

    /// Snapshot database location; relative paths resolve inside .sheetsync/
    pub fn database_path(&self, settings: &Settings) -> PathBuf {
        if settings.delta.database.is_absolute() {
            settings.delta.database.clone()
        } else {
            self.sheetsync_dir.join(&settings.delta.database)
        }
    }

    /// Resolve the watch folder against the workspace root
    pub fn watch_folder(&self, settings: &Settings) -> PathBuf {
        if settings.watcher.folder.is_absolute() {
            settings.watcher.folder.clone()
        } else {
            self.root.join(&settings.watcher.folder)
        }
    }

    /// Load settings with environment overrides applied
    pub fn settings(&self) -> Result<Settings> {
        Ok(Settings::load(&self.config_path())?.with_env_overrides())
    }

    /// Create configuration file with optional force overwrite
    pub fn create_config_with_force(&self, force: bool) -> Result<()> {
        let config_path = self.config_path();

        if config_path.exists() && !force {
            return Ok(());
        }

        let settings = Settings {
            created: Some(chrono::Utc::now()),
            ..Settings::default()
        };
        settings.save(&config_path)
    }

    /// Ensure .gitignore keeps the snapshot database out of version control
    pub fn ensure_gitignore(&self) -> Result<()> {
        let gitignore_path = self.root.join(".gitignore");
        let entry = format!(".sheetsync/{}", crate::DEFAULT_DATABASE);
        let sheetsync_ignore = format!("# Ignore sheetsync snapshot database\n{}\n{}.wal\n", entry, entry);

        if gitignore_path.exists() {
            let content = fs::read_to_string(&gitignore_path)?;
            if !content.contains(&entry) {
                let new_content = if content.ends_with('\n') {
                    format!("{}\n{}", content, sheetsync_ignore)
                } else {
                    format!("{}\n\n{}", content, sheetsync_ignore)
                };
                fs::write(gitignore_path, new_content)?;
                log::info!("Updated .gitignore with sheetsync entries");
            }
        } else {
            fs::write(gitignore_path, sheetsync_ignore)?;
            log::info!("Created .gitignore with sheetsync entries");
        }

        Ok(())
    }
}
