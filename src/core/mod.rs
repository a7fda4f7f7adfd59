//! Command line, configuration and the top level run

pub mod cli;
pub mod config_file;
pub mod errors;
pub mod platform;
pub mod runner;

pub use cli::CliArgs;
pub use config_file::ConfigFile;
pub use errors::{PatchError, PatchResult};
pub use runner::run_app;
