//! Main entry point for sheetsync CLI

use clap::Parser;
use sheetsync::cli::Cli;
use sheetsync::commands::execute_command;
use sheetsync::logging::init_logger;

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging at the requested verbosity
    if let Err(e) = init_logger(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {}", e);
    }

    if let Err(e) = execute_command(cli.command, cli.workspace.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
