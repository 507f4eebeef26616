//! Structured diagnostic messages with severity, codes, and notes.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A structured diagnostic message produced during a simulation run.
///
/// Each diagnostic carries a severity, a unique code and a message, plus an
/// optional file the diagnostic is about (a waveform, a staged source) and
/// free-form notes and help lines.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The unique code identifying the type of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// The file this diagnostic refers to, if any.
    pub path: Option<PathBuf>,
    /// Explanatory footnotes (e.g., "note: ...").
    pub notes: Vec<String>,
    /// Actionable suggestions (e.g., "help: ...").
    pub help: Vec<String>,
}

impl Diagnostic {
    /// Creates a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            path: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Attaches the file this diagnostic is about.
    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}
