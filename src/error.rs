//! Error handling module for archpilot
//!
//! Provides centralized error handling with proper error types using thiserror.
//! The variants follow the installer's error taxonomy: precondition failures
//! are fatal before the UI starts, validation failures stay inside a single
//! wizard step, and command failures halt the phase pipeline.

use thiserror::Error;

/// Main error type for archpilot
#[derive(Error, Debug)]
pub enum InstallerError {
    /// IO errors (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An external command exited unsuccessfully or could not be spawned
    #[error("{command}: {status}: {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },

    /// Preconditions for running the installer are not met (privilege, discovery)
    #[error("{0}")]
    Precondition(String),

    /// Field validation errors (user input, config values)
    #[error("{0}")]
    Validation(String),

    /// Declarative configuration errors (loading, parsing, merging)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON deserialization errors (lsblk output)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Terminal/UI errors
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for archpilot operations
pub type Result<T> = std::result::Result<T, InstallerError>;

impl InstallerError {
    /// Create a command failure from the rendered command line, exit condition and captured output
    pub fn command_failed(
        command: impl Into<String>,
        status: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            status: status.into(),
            output: output.into(),
        }
    }

    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a terminal error
    pub fn terminal(msg: impl Into<String>) -> Self {
        Self::Terminal(msg.into())
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }

    /// Prefix the error message with context, keeping command failures intact
    pub fn context(self, ctx: &str) -> Self {
        match self {
            Self::CommandFailed { .. } => self,
            other => Self::General(format!("{}: {}", ctx, other)),
        }
    }
}
