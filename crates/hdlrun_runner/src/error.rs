//! The error taxonomy of a run.

use std::path::PathBuf;

use hdlrun_common::InternalError;
use hdlrun_engine::EngineError;
use hdlrun_lang::LangError;

use crate::staging::StagingError;

/// Why a run could not be carried out, or why it failed.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The request is inconsistent or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The language/backend/engine combination has no implementation.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// A language tag not present in the registry.
    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    /// A backend tag that names no elaboration backend.
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    /// No language is both accepted by the engine and emitted by the backend.
    #[error("failed to select HDL language for {backend} output from options: {options}")]
    NoCompatibleLanguage {
        /// The backend tag.
        backend: String,
        /// The languages the engine accepts.
        options: String,
    },

    /// No HDL sources remained after conversion and staging.
    #[error("no HDL input specified")]
    NoHdlInput,

    /// The elaborator failed to convert the design.
    #[error("design conversion failed: {0}")]
    Elaboration(#[source] LangError),

    /// A file could not be written to the staging directory.
    #[error("failed to stage {path}: {source}")]
    Staging {
        /// The path being created or written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The build or test step failed.
    #[error("{message}")]
    RunFailure {
        /// `Test failed: ` followed by the underlying failure.
        message: String,
    },

    /// An internal invariant was violated.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl RunError {
    /// Wraps an execution failure in the run-failure message format.
    pub fn run_failure(cause: impl std::fmt::Display) -> Self {
        RunError::RunFailure {
            message: format!("Test failed: {cause}"),
        }
    }
}

impl From<LangError> for RunError {
    fn from(err: LangError) -> Self {
        match err {
            LangError::UnsupportedLanguage(tag) => RunError::UnsupportedLanguage(tag),
            LangError::UnsupportedCapability(reason) => RunError::UnsupportedCapability(reason),
            LangError::UnknownBackend(tag) => RunError::UnknownBackend(tag),
            LangError::InvalidPort(port) => RunError::Configuration(format!("invalid port: {port}")),
            other => RunError::Elaboration(other),
        }
    }
}

impl From<EngineError> for RunError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::UnsupportedCapability(reason) => RunError::UnsupportedCapability(reason),
            EngineError::Internal(e) => RunError::Internal(e),
            other => RunError::run_failure(other),
        }
    }
}

impl From<StagingError> for RunError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::Io { path, source } => RunError::Staging { path, source },
            other => RunError::Configuration(other.to_string()),
        }
    }
}
