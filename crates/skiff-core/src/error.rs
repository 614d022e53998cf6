//! Application error types with rich context

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Application error types organized by layer/domain
#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Common/Infrastructure Errors
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Backend Process Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Streamlit executable not found. Install streamlit or ensure it is in your PATH.")]
    StreamlitNotFound,

    #[error("No app entry point found: {path}")]
    NoEntryPoint { path: PathBuf },

    #[error("Failed to spawn backend process: {reason}")]
    ProcessSpawn { reason: String },

    #[error("Backend process error: {message}")]
    Process { message: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    // ─────────────────────────────────────────────────────────────
    // Channel/Communication Errors
    // ─────────────────────────────────────────────────────────────
    #[error("Channel closed unexpectedly")]
    ChannelClosed,
}

// ─────────────────────────────────────────────────────────────────
// Convenience Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn process(message: impl Into<String>) -> Self {
        Self::Process {
            message: message.into(),
        }
    }

    pub fn process_spawn(reason: impl Into<String>) -> Self {
        Self::ProcessSpawn {
            reason: reason.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this is a recoverable error.
    ///
    /// Recoverable errors are reported to the surface and the shell keeps
    /// running; the user can fix the environment and trigger a restart.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::StreamlitNotFound
                | Error::NoEntryPoint { .. }
                | Error::ProcessSpawn { .. }
                | Error::Process { .. }
        )
    }

    /// Check if this error should terminate the shell itself
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ConfigInvalid { .. } | Error::ChannelClosed)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Context Extensions
// ─────────────────────────────────────────────────────────────────

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", context.into(), err);
            err
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err = e.into();
            tracing::error!("{}: {:?}", f(), err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = Error::process_spawn("permission denied");
        assert_eq!(
            err.to_string(),
            "Failed to spawn backend process: permission denied"
        );

        let err = Error::StreamlitNotFound;
        assert!(err.to_string().contains("Streamlit executable not found"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_resolution_failure_is_recoverable() {
        // A missing executable or entry script is reported to the user,
        // never a crash; fixing the app root and restarting recovers.
        assert!(Error::StreamlitNotFound.is_recoverable());
        assert!(!Error::StreamlitNotFound.is_fatal());

        let err = Error::NoEntryPoint {
            path: PathBuf::from("/app/main.py"),
        };
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_spawn_failure_is_recoverable() {
        let err = Error::process_spawn("EPERM");
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(Error::ChannelClosed.is_fatal());
        assert!(Error::ConfigInvalid {
            message: "bad port".to_string()
        }
        .is_fatal());
        assert!(!Error::process("stream hiccup").is_fatal());
    }

    #[test]
    fn test_result_ext_adds_context() {
        let failing: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = failing.context("opening log directory").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
