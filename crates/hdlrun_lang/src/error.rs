//! Error types for language negotiation and design conversion.

/// Errors raised while resolving languages/backends or converting a design.
#[derive(Debug, thiserror::Error)]
pub enum LangError {
    /// The language tag is not present in the registry.
    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    /// The language is known but the backend cannot produce it, or the
    /// platform shape is not accepted by the backend.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// The backend tag does not name a known elaboration backend.
    #[error("unknown backend '{0}'")]
    UnknownBackend(String),

    /// A port description contained something that is not a port container.
    #[error("invalid port: {0}")]
    InvalidPort(String),

    /// The elaborator ran but reported a failure.
    #[error("elaboration with `{command}` failed: {message}")]
    Elaboration {
        /// The elaborator command line.
        command: String,
        /// The elaborator's error output.
        message: String,
    },

    /// The elaborator could not be started or its pipes failed.
    #[error("failed to run elaborator `{command}`: {source}")]
    Io {
        /// The elaborator command line.
        command: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The elaborator outlived the time limit and was killed.
    #[error("elaboration with `{command}` timed out after {limit:?}")]
    Timeout {
        /// The elaborator command line.
        command: String,
        /// The limit that was exceeded.
        limit: std::time::Duration,
    },

    /// The conversion request could not be encoded for the elaborator.
    #[error("failed to encode conversion request: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unsupported_capability() {
        let err = LangError::UnsupportedCapability("amaranth to VHDL not supported".into());
        assert_eq!(
            err.to_string(),
            "unsupported capability: amaranth to VHDL not supported"
        );
    }

    #[test]
    fn display_unknown_backend() {
        let err = LangError::UnknownBackend("myhdl".into());
        assert_eq!(err.to_string(), "unknown backend 'myhdl'");
    }

    #[test]
    fn display_timeout_keeps_subsecond_limit() {
        let err = LangError::Timeout {
            command: "python3 -m hdlrun_elaborate".into(),
            limit: std::time::Duration::from_millis(1500),
        };
        assert_eq!(
            err.to_string(),
            "elaboration with `python3 -m hdlrun_elaborate` timed out after 1.5s"
        );
    }

    #[test]
    fn display_elaboration() {
        let err = LangError::Elaboration {
            command: "python3 -m hdlrun_elaborate".into(),
            message: "NameError: Adder".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("python3 -m hdlrun_elaborate"));
        assert!(msg.contains("NameError: Adder"));
    }
}
