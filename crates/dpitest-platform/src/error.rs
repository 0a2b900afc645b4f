//! Error types for dpitest-platform

use thiserror::Error;

/// Platform-level error type
#[derive(Error, Debug)]
pub enum Error {
    /// A process could not be spawned
    #[error("Failed to spawn '{program}': {message}")]
    Spawn {
        /// Program name
        program: String,
        /// OS error text
        message: String,
    },

    /// A process missed its wall-clock budget
    #[error("'{program}' timed out after {seconds}s")]
    Timeout {
        /// Program name
        program: String,
        /// Budget that was exceeded
        seconds: u64,
    },

    /// A process exited unsuccessfully
    #[error("'{program}' exited with {code:?}: {stderr}")]
    CommandFailed {
        /// Program name
        program: String,
        /// Exit code, if any
        code: Option<i32>,
        /// Captured stderr
        stderr: String,
    },

    /// The service never reached the running state
    #[error("Service '{service}' did not reach running state (last status: {status})")]
    ServiceNotRunning {
        /// Service name
        service: String,
        /// Last observed status
        status: String,
    },

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a spawn error
    pub fn spawn(program: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Spawn {
            program: program.into(),
            message: message.into(),
        }
    }
}
