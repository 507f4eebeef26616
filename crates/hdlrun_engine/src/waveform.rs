//! Waveform destinations, per-engine trace planning and reconciliation.

use std::path::{Path, PathBuf};

use hdlrun_common::{ParseWaveformError, WaveformFormat};
use hdlrun_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};

use crate::profile::{EngineProfile, WaveformRule};

/// Where the caller wants the trace, and in which format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaveformRequest {
    /// The absolute destination path.
    pub destination: PathBuf,
    /// The format inferred from the destination's extension.
    pub format: WaveformFormat,
}

impl WaveformRequest {
    /// Validates `path` and absolutizes it against `cwd`.
    pub fn new(path: &Path, cwd: &Path) -> Result<Self, ParseWaveformError> {
        let format = WaveformFormat::from_path(path)?;
        Ok(Self {
            destination: cwd.join(path),
            format,
        })
    }
}

/// How one engine will produce the requested trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WaveformPlan {
    /// The caller's request.
    pub request: WaveformRequest,
    /// Where the engine leaves the trace.
    pub intermediate: PathBuf,
    /// Whether the build step enables tracing.
    pub build_waves: bool,
    /// Whether the test step enables tracing.
    pub test_waves: bool,
    /// Flags added to both build and, if mirrored, test arguments.
    pub trace_flags: Vec<String>,
    /// Plusargs added to the test step.
    pub plusargs: Vec<String>,
    /// True if the engine can only approximate the request.
    pub degraded: bool,
}

impl WaveformPlan {
    /// Plans the trace for `profile` building `toplevel` in `build_dir`.
    pub fn new(
        profile: &EngineProfile,
        request: &WaveformRequest,
        toplevel: &str,
        build_dir: &Path,
    ) -> Self {
        let format = request.format;
        let degradation = profile.degraded.filter(|d| d.format == format);
        let mut plusargs: Vec<String> = degradation
            .map(|d| d.plusargs.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        let intermediate = match profile.waveform {
            WaveformRule::BuildDir(template) => build_dir.join(
                template
                    .replace("{toplevel}", toplevel)
                    .replace("{format}", format.extension()),
            ),
            WaveformRule::Plusarg(template) => {
                plusargs.push(
                    template
                        .replace("{format}", format.extension())
                        .replace("{path}", &request.destination.to_string_lossy()),
                );
                request.destination.clone()
            }
        };

        Self {
            request: request.clone(),
            intermediate,
            build_waves: true,
            test_waves: degradation.is_none(),
            trace_flags: profile.trace_flags_for(format).map(String::from).collect(),
            plusargs,
            degraded: degradation.is_some(),
        }
    }
}

/// Moves a finished trace from where the engine wrote it to where the caller
/// asked for it.
#[derive(Debug, Default)]
pub struct WaveformManager;

impl WaveformManager {
    /// Copies `intermediate` to `destination` if the engine produced it.
    ///
    /// A missing trace, or one that cannot be copied, is reported as a
    /// `W301` warning and never fails the run. Returns the destination when
    /// a trace is in place.
    pub fn reconcile(
        intermediate: &Path,
        destination: &Path,
        sink: &DiagnosticSink,
    ) -> Option<PathBuf> {
        if !intermediate.is_file() {
            sink.emit(
                Diagnostic::warning(
                    DiagnosticCode::WAVEFORM_MISSING,
                    format!(
                        "failed to find waveform output file: {}",
                        intermediate.display()
                    ),
                )
                .with_path(intermediate),
            );
            return None;
        }

        if same_file(intermediate, destination) {
            log::debug!("waveform already at {}", destination.display());
            return Some(destination.to_path_buf());
        }

        match std::fs::copy(intermediate, destination) {
            Ok(_) => {
                log::info!(
                    "copied waveform {} -> {}",
                    intermediate.display(),
                    destination.display()
                );
                Some(destination.to_path_buf())
            }
            Err(e) => {
                sink.emit(
                    Diagnostic::warning(
                        DiagnosticCode::WAVEFORM_MISSING,
                        format!("failed to copy waveform to {}", destination.display()),
                    )
                    .with_path(destination)
                    .with_note(e.to_string()),
                );
                None
            }
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
