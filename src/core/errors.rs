//! Fatal error kinds for a patch run
//!
//! Every fatal condition is either a configuration problem (bad flags,
//! contradictory glyph parameters, inconsistent scale rules) or a data
//! problem (unusable source font, missing donor, corrupt binary). The two
//! kinds map onto distinct process exit codes.

use thiserror::Error;

/// Exit status for fatal data problems
pub const EXIT_DATA: i32 = 1;

/// Exit status for fatal configuration problems
pub const EXIT_CONFIGURATION: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{0}")]
    Data(String),
}

impl PatchError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }

    /// The process exit status this error terminates with
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => EXIT_CONFIGURATION,
            Self::Data(_) => EXIT_DATA,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Configuration(message) | Self::Data(message) => message,
        }
    }
}

pub type PatchResult<T> = Result<T, PatchError>;
