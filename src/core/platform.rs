//! Process entry helpers and error handling

use crate::core::cli::CliArgs;
use crate::core::errors::{PatchError, EXIT_DATA};

/// Exit status for an error returned by the runner
///
/// Errors that are not a [`PatchError`] (I/O, logging setup) count as data
/// problems.
pub fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<PatchError>()
        .map(PatchError::exit_code)
        .unwrap_or(EXIT_DATA)
}

/// Report a fatal error and exit with its status
pub fn handle_error(error: anyhow::Error) -> ! {
    let code = exit_code(&error);
    tracing::error!("{error:#}");
    eprintln!();
    eprintln!("glyph-patcher: {error:#}");
    eprintln!();
    eprintln!("Try running with --help for usage information.");
    std::process::exit(code);
}

/// Parse command line arguments
pub fn get_cli_args() -> CliArgs {
    use clap::Parser;
    CliArgs::parse()
}
