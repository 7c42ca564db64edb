//! Unit tests for CLI argument parsing and validation

use clap::Parser;
use sheetsync::cli::{Cli, Commands, OutputFormat};
use sheetsync::logging::level_for;
use std::path::PathBuf;

#[test]
fn test_cli_init_command() {
    let cli = Cli::try_parse_from(["sheetsync", "init"]).unwrap();
    match cli.command {
        Commands::Init { force } => assert!(!force),
        _ => panic!("Expected Init command"),
    }
}

#[test]
fn test_cli_init_command_with_force() {
    let cli = Cli::try_parse_from(["sheetsync", "init", "--force"]).unwrap();
    match cli.command {
        Commands::Init { force } => assert!(force),
        _ => panic!("Expected Init command"),
    }
}

#[test]
fn test_cli_parse_command() {
    let cli = Cli::try_parse_from(["sheetsync", "parse", "report.xlsx", "--sheet", "Q3"]).unwrap();
    match cli.command {
        Commands::Parse { file, format, sheet } => {
            assert_eq!(file, PathBuf::from("report.xlsx"));
            assert_eq!(format, "pretty");
            assert_eq!(sheet.as_deref(), Some("Q3"));
        }
        _ => panic!("Expected Parse command"),
    }
}

#[test]
fn test_cli_sync_command_defaults() {
    let cli = Cli::try_parse_from(["sheetsync", "sync", "data.csv"]).unwrap();
    match cli.command {
        Commands::Sync {
            file,
            stream,
            key,
            no_push,
            no_notify,
            json,
        } => {
            assert_eq!(file, PathBuf::from("data.csv"));
            assert!(stream.is_none());
            assert!(key.is_empty());
            assert!(!no_push);
            assert!(!no_notify);
            assert!(!json);
        }
        _ => panic!("Expected Sync command"),
    }
}

#[test]
fn test_cli_sync_command_with_options() {
    let cli = Cli::try_parse_from([
        "sheetsync", "sync", "data.csv",
        "--stream", "sales",
        "--key", "id",
        "--no-notify",
        "--json",
    ])
    .unwrap();

    match cli.command {
        Commands::Sync {
            stream,
            key,
            no_push,
            no_notify,
            json,
            ..
        } => {
            assert_eq!(stream.as_deref(), Some("sales"));
            assert_eq!(key, vec!["id"]);
            assert!(!no_push);
            assert!(no_notify);
            assert!(json);
        }
        _ => panic!("Expected Sync command"),
    }
}

#[test]
fn test_cli_watch_command() {
    let cli = Cli::try_parse_from([
        "sheetsync", "watch",
        "--folder", "incoming",
        "--pattern", "*.csv",
        "--pattern", "report_*.xlsx",
        "--once",
    ])
    .unwrap();

    match cli.command {
        Commands::Watch {
            folder,
            pattern,
            once,
            ..
        } => {
            assert_eq!(folder, Some(PathBuf::from("incoming")));
            assert_eq!(pattern, vec!["*.csv", "report_*.xlsx"]);
            assert!(once);
        }
        _ => panic!("Expected Watch command"),
    }
}

#[test]
fn test_cli_show_and_reset_commands() {
    let cli = Cli::try_parse_from(["sheetsync", "show", "--stream", "sales", "--rows"]).unwrap();
    match cli.command {
        Commands::Show { stream, rows, format } => {
            assert_eq!(stream.as_deref(), Some("sales"));
            assert!(rows);
            assert_eq!(format, "pretty");
        }
        _ => panic!("Expected Show command"),
    }

    let cli = Cli::try_parse_from(["sheetsync", "reset"]).unwrap();
    match cli.command {
        Commands::Reset { stream } => assert!(stream.is_none()),
        _ => panic!("Expected Reset command"),
    }
}

#[test]
fn test_cli_global_flags() {
    let cli = Cli::try_parse_from([
        "sheetsync", "show", "--workspace", "/tmp/ws", "-v",
    ])
    .unwrap();
    assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/ws")));
    assert!(cli.verbose);
}

#[test]
fn test_cli_verbose_selects_debug_level() {
    let quiet = Cli::try_parse_from(["sheetsync", "show"]).unwrap();
    assert_eq!(level_for(quiet.verbose), log::LevelFilter::Info);

    let verbose = Cli::try_parse_from(["sheetsync", "-v", "show"]).unwrap();
    assert_eq!(level_for(verbose.verbose), log::LevelFilter::Debug);
}

#[test]
fn test_cli_missing_required_args() {
    assert!(Cli::try_parse_from(["sheetsync", "sync"]).is_err());
    assert!(Cli::try_parse_from(["sheetsync", "parse"]).is_err());
    assert!(Cli::try_parse_from(["sheetsync", "rollback"]).is_err());
}

#[test]
fn test_output_format_parsing() {
    assert_eq!(OutputFormat::parse("pretty").unwrap(), OutputFormat::Pretty);
    assert_eq!(OutputFormat::parse("Json").unwrap(), OutputFormat::Json);
    let err = OutputFormat::parse("yaml").unwrap_err();
    assert!(err.contains("Invalid output format"));
}
