//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for shared helpers
pub type Result<T> = std::result::Result<T, InmoError>;

/// Errors raised by the common helpers
#[derive(Error, Debug)]
pub enum InmoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidEnv {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

impl InmoError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
