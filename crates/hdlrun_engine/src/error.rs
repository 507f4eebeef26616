//! Error types for engine resolution and execution.

use std::time::Duration;

use hdlrun_common::InternalError;

/// Errors raised while preparing or executing a simulation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine cannot do what the request asks (language, waveform format).
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// A build subprocess exited unsuccessfully.
    #[error("build step `{command}` failed: {message}")]
    Build {
        /// The command line that failed.
        command: String,
        /// The captured error output or exit status.
        message: String,
    },

    /// The test subprocess exited unsuccessfully or reported failing tests.
    #[error("test step `{command}` failed: {message}")]
    Test {
        /// The command line that failed.
        command: String,
        /// The captured error output, exit status or results summary.
        message: String,
    },

    /// A subprocess exceeded the configured time limit and was killed.
    #[error("`{command}` timed out after {limit:?}")]
    Timeout {
        /// The command line that was killed.
        command: String,
        /// The limit that was exceeded.
        limit: Duration,
    },

    /// A subprocess could not be started or waited on.
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        /// The command line.
        command: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// No toolchain is available for the engine.
    #[error("no toolchain configured for simulator '{0}'")]
    NoToolchain(String),

    /// The test runtime's install locations could not be determined.
    #[error("test runtime unavailable: {0}")]
    Runtime(String),

    /// A support file could not be written into the build directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An adapter invariant was violated.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl EngineError {
    /// Returns true for failures of the external build or test step.
    ///
    /// These are reported as an unsuccessful run rather than as a
    /// configuration problem.
    pub fn is_execution_failure(&self) -> bool {
        !matches!(
            self,
            EngineError::UnsupportedCapability(_) | EngineError::Internal(_)
        )
    }
}
