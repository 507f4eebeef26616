//! Diagnostic accumulator for one simulation run.

use crate::code::DiagnosticCode;
use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// An accumulator for diagnostics emitted while a run is resolved and executed.
///
/// Every emitted diagnostic is also mirrored to the `log` facade at the level
/// matching its severity, so library users without a renderer still see it.
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    error_count: AtomicUsize,
}

impl DiagnosticSink {
    /// Creates a new empty diagnostic sink.
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            error_count: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.diagnostics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Emits a diagnostic into the sink.
    pub fn emit(&self, diag: Diagnostic) {
        if diag.severity == Severity::Error {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        log::log!(diag.severity.log_level(), "[{}] {}", diag.code, diag.message);
        self.lock().push(diag);
    }

    /// Returns `true` if any error-severity diagnostics have been emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count.load(Ordering::Relaxed) > 0
    }

    /// Returns the number of error-severity diagnostics emitted so far.
    pub fn error_count(&self) -> usize {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Returns `true` if a diagnostic with the given code has been emitted.
    pub fn contains(&self, code: DiagnosticCode) -> bool {
        self.lock().iter().any(|d| d.code == code)
    }

    /// Takes all accumulated diagnostics, leaving the sink empty.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    /// Returns a snapshot of all accumulated diagnostics without draining.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}
