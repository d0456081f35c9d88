//! Error types for the ingestion pipeline
//!
//! Only some of these end a run. Per-artifact problems in the direct loader
//! and column mismatches are turned into [`crate::outcome::LoadOutcome`]
//! values; connectivity, schema and REST status errors propagate to the
//! binary and produce a non-zero exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// Missing or invalid environment/CLI configuration
    #[error("Configuration error: {0}. Check your .env file or environment variables.")]
    Config(String),

    #[error(transparent)]
    Common(#[from] inmo_common::InmoError),

    /// Every connection route failed
    #[error("Connectivity error: {0}")]
    Connectivity(String),

    /// A schema script failed; remaining scripts are not applied
    #[error("Schema script '{script}' failed: {message}")]
    Schema { script: String, message: String },

    /// Non-2xx answer from the REST data API
    #[error("REST {method} on '{table}' returned HTTP {status}: {body}")]
    Rest {
        method: &'static str,
        table: String,
        status: u16,
        body: String,
    },

    #[error("Directory not found: '{0}'")]
    MissingDirectory(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid connection URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Pattern error: {0}")]
    Regex(#[from] regex::Error),
}

impl IngestError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connectivity error
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }
}
