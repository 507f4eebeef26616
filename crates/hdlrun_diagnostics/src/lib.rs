//! Non-fatal run diagnostics and their terminal rendering.
//!
//! A simulation run reports conditions that do not abort it (a waveform that
//! could not be recovered, an engine that silently drops a trace format, an
//! unknown simulator) as structured [`Diagnostic`]s. The [`DiagnosticSink`]
//! accumulates them for the duration of a run and [`TerminalRenderer`]
//! formats them for the command line.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
