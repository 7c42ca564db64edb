//! Logger setup for the sheetsync binary

use log::LevelFilter;

/// Default level for the CLI: Info, or Debug with `--verbose`
pub fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Install env_logger at the CLI level. `RUST_LOG` directives still apply
/// on top, so `RUST_LOG=sheetsync=trace` works with or without `-v`.
pub fn init_logger(verbose: bool) -> Result<(), log::SetLoggerError> {
    env_logger::Builder::new()
        .filter_level(level_for(verbose))
        .parse_env("RUST_LOG")
        .try_init()
}
