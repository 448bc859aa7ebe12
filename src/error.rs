//! Top-level error types for the bundler binary.
//!
//! Pipeline errors live in [`crate::bundler::error`]; this module wraps
//! them together with CLI, I/O, and JSON failures for the binary surface.

use thiserror::Error;

/// Result type alias for CLI-level operations.
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type for the bundler binary.
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Pipeline errors
    #[error("build error: {0}")]
    Bundler(#[from] crate::bundler::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },
}

impl BundlerError {
    /// Whether rerunning the same invocation could plausibly succeed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            BundlerError::Bundler(e) => e.is_recoverable(),
            BundlerError::Io(_) => true,
            _ => false,
        }
    }
}
