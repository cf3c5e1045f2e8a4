//! Error types for the zap-core library.

use thiserror::Error;

use crate::domain::Strategy;

/// Result type alias for zap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, inspecting or terminating processes.
#[derive(Error, Debug)]
pub enum Error {
    /// The user-supplied port query is malformed.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The process vanished between discovery and inspection/action.
    #[error("Process {0} not found")]
    ProcessNotFound(u32),

    /// A kernel table or cgroup record could not be read.
    #[error("Detection unavailable: {0}")]
    DetectionUnavailable(String),

    /// Failed to execute a system command.
    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    /// Failed to terminate a target (signal, container or unit).
    #[error("Failed to kill {target}: {reason}")]
    KillFailed { target: String, reason: String },

    /// Permission denied for an operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The requested strategy does not apply to the process.
    #[error("Strategy '{0}' is not applicable to this process")]
    StrategyUnavailable(Strategy),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Platform not supported.
    #[error("Platform not supported: {0}")]
    UnsupportedPlatform(String),
}

impl Error {
    /// Soft errors skip a single item; the rest of a batch continues.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Error::ProcessNotFound(_) | Error::DetectionUnavailable(_)
        )
    }
}
