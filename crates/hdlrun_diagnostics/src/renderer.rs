//! Diagnostic rendering for the terminal.

use crate::diagnostic::Diagnostic;
use crate::severity::Severity;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic) -> String;
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// warning[W301]: failed to find waveform output file
///   --> /tmp/.tmpX/top.fst
///    = note: ...
///    = help: ...
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn severity_label(&self, severity: Severity) -> String {
        if !self.color {
            return severity.to_string();
        }
        let ansi = match severity {
            Severity::Error => "31",
            Severity::Warning => "33",
            Severity::Note | Severity::Help => "36",
        };
        format!("\x1b[1;{ansi}m{severity}\x1b[0m")
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic) -> String {
        let mut out = format!(
            "{}[{}]: {}\n",
            self.severity_label(diag.severity),
            diag.code,
            diag.message
        );

        if let Some(path) = &diag.path {
            out.push_str(&format!("  --> {}\n", path.display()));
        }
        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }
        for help in &diag.help {
            out.push_str(&format!("   = help: {help}\n"));
        }

        out
    }
}
