//! Command implementations for sheetsync CLI

use crate::change_detection::DeltaTracker;
use crate::cli::{Commands, OutputFormat};
use crate::config::Settings;
use crate::data::DataProcessor;
use crate::error::{Result, SheetSyncError};
use crate::hash::IdentityKey;
use crate::notifier::WebhookNotifier;
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::pipeline::SyncPipeline;
use crate::progress::ProgressReporter;
use crate::sheets::GoogleSheetsWriter;
use crate::snapshot::{DuckDbSnapshotStore, SnapshotStore};
use crate::watcher::FolderWatcher;
use crate::workspace::SyncWorkspace;
use std::path::{Path, PathBuf};

/// Execute a command
pub fn execute_command(command: Commands, workspace_path: Option<&Path>) -> Result<()> {
    match command {
        Commands::Init { force } => init_command(workspace_path, force),
        Commands::Parse {
            file,
            format,
            sheet,
        } => parse_command(&file, &format, sheet),
        Commands::Sync {
            file,
            stream,
            key,
            no_push,
            no_notify,
            json,
        } => sync_command(
            workspace_path,
            &file,
            SyncOptions {
                stream,
                key,
                push: !no_push,
                notify: !no_notify,
                show_progress: !json,
            },
            json,
        ),
        Commands::Watch {
            folder,
            pattern,
            once,
            no_push,
            no_notify,
        } => watch_command(
            workspace_path,
            folder,
            pattern,
            once,
            SyncOptions {
                stream: None,
                key: Vec::new(),
                push: !no_push,
                notify: !no_notify,
                show_progress: false,
            },
        ),
        Commands::Show {
            stream,
            rows,
            format,
        } => show_command(workspace_path, stream.as_deref(), rows, &format),
        Commands::Reset { stream } => reset_command(workspace_path, stream.as_deref()),
    }
}

/// Per-run choices that override the workspace config
struct SyncOptions {
    stream: Option<String>,
    key: Vec<String>,
    push: bool,
    notify: bool,
    show_progress: bool,
}

/// Initialize sheetsync workspace
fn init_command(workspace_path: Option<&Path>, force: bool) -> Result<()> {
    let current_dir = std::env::current_dir()?;
    let root = workspace_path.unwrap_or(&current_dir);

    let workspace = if force {
        let workspace = SyncWorkspace::from_root(root.to_path_buf());
        std::fs::create_dir_all(&workspace.sheetsync_dir)?;
        workspace.create_config_with_force(true)?;
        workspace.ensure_gitignore()?;
        workspace
    } else {
        // Always initialize in the given directory, never a parent
        SyncWorkspace::create_new(root.to_path_buf())?
    };

    println!("✅ Initialized sheetsync workspace at: {}", workspace.root.display());
    println!("📁 Config: {}", workspace.config_path().display());

    Ok(())
}

/// Print a cleaned table
fn parse_command(file: &Path, format: &str, sheet: Option<String>) -> Result<()> {
    let output_format = OutputFormat::parse(format).map_err(SheetSyncError::invalid_input)?;

    let mut processor = DataProcessor::new()?;
    if let Some(sheet) = sheet {
        processor = processor.with_sheet(sheet);
    }
    let table = processor.load_table(file)?;

    match output_format {
        OutputFormat::Pretty => {
            println!(
                "📄 {} ({} rows, {} columns)",
                file.display(),
                table.row_count(),
                table.column_count()
            );
            PrettyPrinter::print_table(&table, Some(20));
        }
        OutputFormat::Json => println!("{}", JsonFormatter::format_table(&table)?),
    }

    Ok(())
}

/// One-shot pipeline run
fn sync_command(
    workspace_path: Option<&Path>,
    file: &Path,
    options: SyncOptions,
    json: bool,
) -> Result<()> {
    let workspace = SyncWorkspace::find_or_create(workspace_path)?;
    let settings = workspace.settings()?;
    let mut pipeline = build_pipeline(&workspace, &settings, &options)?;

    let report = pipeline.run(file)?;

    if json {
        println!("{}", JsonFormatter::format_sync_report(&report)?);
    } else {
        PrettyPrinter::print_sync_report(&report);
    }

    Ok(())
}

/// Sync existing files, then every matching file that appears
fn watch_command(
    workspace_path: Option<&Path>,
    folder: Option<PathBuf>,
    patterns: Vec<String>,
    once: bool,
    options: SyncOptions,
) -> Result<()> {
    let workspace = SyncWorkspace::find_or_create(workspace_path)?;
    let settings = workspace.settings()?;

    let folder = folder.unwrap_or_else(|| workspace.watch_folder(&settings));
    let mut watcher = FolderWatcher::from_settings(&settings.watcher, folder)?;
    if !patterns.is_empty() {
        watcher = watcher.with_patterns(patterns.as_slice())?;
    }

    let mut pipeline = build_pipeline(&workspace, &settings, &options)?;

    let existing = watcher.existing_files()?;
    if !existing.is_empty() {
        println!("📂 Processing {} existing files...", existing.len());
    }
    for path in &existing {
        sync_watched_file(&mut pipeline, path);
    }

    if once {
        println!("✅ Processed {} files", existing.len());
        return Ok(());
    }

    let events = watcher.start()?;
    println!(
        "👀 Watching {} for {} (Ctrl+C to stop)",
        watcher.folder().display(),
        watcher.patterns().join(", ")
    );

    for path in events {
        sync_watched_file(&mut pipeline, &path);
    }

    watcher.stop();
    Ok(())
}

/// Errors are reported and the watcher keeps going
fn sync_watched_file<S: SnapshotStore>(pipeline: &mut SyncPipeline<S>, path: &Path) {
    match pipeline.run(path) {
        Ok(report) => PrettyPrinter::print_sync_report(&report),
        Err(e) => {
            log::error!("Failed to sync {}: {}", path.display(), e);
            eprintln!("❌ Failed to sync {}: {}", path.display(), e);
        }
    }
}

/// Show tracked streams, or one stream's snapshot
fn show_command(
    workspace_path: Option<&Path>,
    stream: Option<&str>,
    rows: bool,
    format: &str,
) -> Result<()> {
    let output_format = OutputFormat::parse(format).map_err(SheetSyncError::invalid_input)?;

    let workspace = SyncWorkspace::find_or_create(workspace_path)?;
    let settings = workspace.settings()?;
    let store = DuckDbSnapshotStore::open(workspace.database_path(&settings))?;

    match stream {
        Some(stream_id) => {
            let snapshot = store.load(stream_id)?;
            match output_format {
                OutputFormat::Pretty => PrettyPrinter::print_snapshot(stream_id, &snapshot, rows),
                OutputFormat::Json => {
                    println!("{}", JsonFormatter::format_snapshot(stream_id, &snapshot, rows)?)
                }
            }
        }
        None => {
            let streams = store.streams()?;
            match output_format {
                OutputFormat::Pretty => PrettyPrinter::print_stream_list(&streams),
                OutputFormat::Json => println!("{}", JsonFormatter::format(&streams)?),
            }
        }
    }

    Ok(())
}

/// Clear a stream's snapshot
fn reset_command(workspace_path: Option<&Path>, stream: Option<&str>) -> Result<()> {
    let workspace = SyncWorkspace::find_or_create(workspace_path)?;
    let settings = workspace.settings()?;
    let stream_id = stream.unwrap_or(&settings.delta.stream);

    let store = DuckDbSnapshotStore::open(workspace.database_path(&settings))?;
    let mut tracker = DeltaTracker::new(store).with_stream(stream_id);
    if tracker.reset()? {
        println!("🗑️  Cleared snapshot for stream '{}'", stream_id);
    } else {
        println!("No snapshot stored for stream '{}'", stream_id);
    }

    Ok(())
}

/// Wire the parser, tracker and configured sinks together
fn build_pipeline(
    workspace: &SyncWorkspace,
    settings: &Settings,
    options: &SyncOptions,
) -> Result<SyncPipeline<DuckDbSnapshotStore>> {
    let store = DuckDbSnapshotStore::open(workspace.database_path(settings))?;

    let stream = options
        .stream
        .clone()
        .unwrap_or_else(|| settings.delta.stream.clone());
    let key = if options.key.is_empty() {
        settings.delta.identity_key()
    } else {
        IdentityKey::from_columns(options.key.iter().cloned())
    };
    log::debug!("Tracking stream '{}' keyed on {}", stream, key.describe());

    let tracker = DeltaTracker::new(store)
        .with_stream(stream)
        .with_identity_key(key);

    let progress = if options.show_progress {
        ProgressReporter::new_for_sync()
    } else {
        ProgressReporter::new_minimal()
    };

    let mut pipeline = SyncPipeline::new(DataProcessor::new()?, tracker).with_progress(progress);

    if options.push {
        if settings.sheets.is_configured() {
            pipeline = pipeline.with_sheet_writer(Box::new(GoogleSheetsWriter::from_settings(
                &settings.sheets,
            )?));
        } else {
            log::info!("No spreadsheet configured; set sheets.spreadsheet_id to enable pushing");
        }
    }

    if options.notify {
        if settings.webhook.is_configured() {
            pipeline = pipeline.with_notifier(Box::new(WebhookNotifier::from_settings(
                &settings.webhook,
            )?));
        } else {
            log::info!("No webhook configured; set webhook.url to enable notifications");
        }
    }

    Ok(pipeline)
}
