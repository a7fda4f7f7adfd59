//! Per-run diagnostic record
//!
//! Components report what they decided (skipped glyphs, accepted metric
//! mismatches, failed table fixups) through a [`Diagnostics`] value that is
//! passed explicitly through the call chain. Every entry is also forwarded
//! to `tracing`, so the same message reaches the console and the log file.

use std::fmt;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// Collected diagnostics of one patch run
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn debug(&mut self, message: impl Into<String>) {
        self.push(Severity::Debug, message.into());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message.into());
    }

    pub fn critical(&mut self, message: impl Into<String>) {
        self.push(Severity::Critical, message.into());
    }

    fn push(&mut self, severity: Severity, message: String) {
        match severity {
            Severity::Debug => debug!("{}", message),
            Severity::Info => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error | Severity::Critical => error!("{}", message),
        }
        self.entries.push(Diagnostic { severity, message });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.severity == severity)
            .count()
    }

    /// Entries of the given severity or worse
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(move |entry| entry.severity >= severity)
    }

    pub fn has_warnings(&self) -> bool {
        self.at_least(Severity::Warning).next().is_some()
    }

    /// Whether any message contains the given text, used by tests and the
    /// end-of-run summary
    pub fn mentions(&self, needle: &str) -> bool {
        self.entries.iter().any(|entry| entry.message.contains(needle))
    }

    /// One line summary for the end of a run
    pub fn summary(&self) -> String {
        format!(
            "{} warning(s), {} error(s)",
            self.count(Severity::Warning),
            self.count(Severity::Error) + self.count(Severity::Critical)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_are_ordered() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn records_entries_in_order() {
        let mut diag = Diagnostics::new();
        diag.debug("skipping U+E0A0");
        diag.warn("metrics differ");
        diag.error("fixup failed");

        assert_eq!(diag.entries().len(), 3);
        assert_eq!(diag.entries()[1].severity, Severity::Warning);
        assert_eq!(diag.count(Severity::Debug), 1);
        assert!(diag.has_warnings());
        assert!(diag.mentions("U+E0A0"));
        assert_eq!(diag.summary(), "1 warning(s), 1 error(s)");
    }

    #[test]
    fn debug_only_run_has_no_warnings() {
        let mut diag = Diagnostics::new();
        diag.debug("nothing to see");
        diag.info("done");
        assert!(!diag.has_warnings());
        assert_eq!(diag.at_least(Severity::Info).count(), 1);
    }
}
