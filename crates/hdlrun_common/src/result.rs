//! Common result and error types for the hdlrun workspace.

/// The result type for operations whose only failure mode is a bug.
///
/// User-facing problems (bad requests, failing simulations) have their own
/// error enums in the crates that detect them. `Err` here always means an
/// internal invariant of hdlrun was violated.
pub type RunnerResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in hdlrun, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
