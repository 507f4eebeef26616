//! Diagnostic severity levels ordered from least to most severe.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The severity level of a diagnostic message.
///
/// Ordered from least severe (`Help`) to most severe (`Error`) by declaration
/// order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Severity {
    /// A suggestion that does not indicate a problem.
    Help,
    /// Additional context about the run.
    Note,
    /// A condition worth reviewing that does not fail the run.
    Warning,
    /// A problem that fails the run.
    Error,
}

impl Severity {
    /// Returns `true` if this severity is [`Error`](Severity::Error).
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// Returns the `log` level diagnostics of this severity are mirrored at.
    pub fn log_level(self) -> log::Level {
        match self {
            Severity::Help | Severity::Note => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Help => write!(f, "help"),
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}
