//! Error types for dpitest-core
//!
//! Centralized error handling using `thiserror` for ergonomic error definitions.

use thiserror::Error;

/// Main error type for dpitest-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Reading or writing a strategy or the live configuration failed
    #[error("Config I/O error for '{path}': {message}")]
    ConfigIo {
        /// Path that could not be read or written
        path: String,
        /// Detailed error message
        message: String,
    },

    /// Controlling the service under test failed
    #[error("Service control failed during {operation}: {message}")]
    ServiceControl {
        /// The operation that failed (stop, start, verify, ...)
        operation: String,
        /// Error message
        message: String,
    },

    /// Target catalog parsing failed
    #[error("Catalog error in '{path}' at line {line}: {message}")]
    Catalog {
        /// Path to the catalog file
        path: String,
        /// Line number (1-based)
        line: usize,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// Path to the missing config file
        path: String,
    },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    ConfigValue {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a config I/O error
    pub fn config_io(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a service control error
    pub fn service_control(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ServiceControl {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a catalog error
    pub fn catalog(path: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Catalog {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Create a config value error
    pub fn config_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
