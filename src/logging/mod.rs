//! Application logging functionality
//!
//! Console output goes through a `tracing-subscriber` fmt layer whose level
//! follows `--debug`/`--quiet` (overridable with `RUST_LOG`). When the debug
//! mode asks for it, a second layer writes everything down to `debug` level
//! into a log file in the output directory.

pub mod diagnostics;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Name of the log file written next to the patched font
pub const LOG_FILE_NAME: &str = "glyph-patcher-log.txt";

/// What `--debug` selects
///
/// The flag is a bitmask: bit 0 writes the log file, bit 1 prints debug
/// messages on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugMode(u8);

impl DebugMode {
    pub fn new(bits: u8) -> Self {
        Self(bits & 0b11)
    }

    pub fn log_to_file(self) -> bool {
        self.0 & 0b01 != 0
    }

    pub fn verbose_console(self) -> bool {
        self.0 & 0b10 != 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

/// Console level for the given flags
pub fn console_level(mode: DebugMode, quiet: bool) -> LevelFilter {
    if mode.verbose_console() {
        LevelFilter::DEBUG
    } else if quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::INFO
    }
}

/// Install the global subscriber.
///
/// The returned guard must be kept alive for the duration of the run or the
/// file writer drops buffered lines.
pub fn init(
    mode: DebugMode,
    quiet: bool,
    output_dir: &Path,
) -> anyhow::Result<Option<WorkerGuard>> {
    let level = console_level(mode, quiet);
    let console_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    let console_layer = fmt::layer()
        .with_target(false)
        .without_time()
        .with_filter(console_filter);

    let (file_layer, guard) = if mode.log_to_file() {
        std::fs::create_dir_all(output_dir)?;
        let appender = tracing_appender::rolling::never(output_dir, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(LevelFilter::DEBUG);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    if guard.is_some() {
        tracing::debug!(
            "=== glyph-patcher started at {} ===",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        );
        tracing::debug!("Logging to {:?}", output_dir.join(LOG_FILE_NAME));
    }

    Ok(guard)
}
