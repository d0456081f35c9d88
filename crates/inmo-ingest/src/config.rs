//! Configuration management
//!
//! Values come from the process environment after `.env` has been loaded.
//! CLI flags override the directory settings in the command layer.

use crate::error::{IngestError, Result};
use inmo_common::env;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Directory scanned for CSV exports.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Directory holding the ordered `.sql` schema scripts.
pub const DEFAULT_SCHEMA_DIR: &str = "./sql";

/// Region used to build the session pooler hostname.
pub const DEFAULT_POOLER_REGION: &str = "us-east-1";

/// Database connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Per-request timeout for the REST data API in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// Rows per REST insert request.
pub const DEFAULT_REST_BATCH_SIZE: usize = 500;

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub data_dir: PathBuf,
    pub schema_dir: PathBuf,
    pub pooler_region: String,
    pub connect_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub rest_batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            schema_dir: PathBuf::from(DEFAULT_SCHEMA_DIR),
            pooler_region: DEFAULT_POOLER_REGION.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            rest_batch_size: DEFAULT_REST_BATCH_SIZE,
        }
    }
}

impl IngestConfig {
    /// Load `.env`, then read the environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read configuration from the environment
    ///
    /// - `INMO_DATA_DIR`, `INMO_SCHEMA_DIR`
    /// - `SUPABASE_POOLER_REGION`
    /// - `INMO_CONNECT_TIMEOUT_SECS`, `INMO_HTTP_TIMEOUT_SECS`
    /// - `INMO_REST_BATCH_SIZE`
    pub fn from_env() -> Result<Self> {
        let config = Self {
            data_dir: PathBuf::from(env::var_or("INMO_DATA_DIR", DEFAULT_DATA_DIR)),
            schema_dir: PathBuf::from(env::var_or("INMO_SCHEMA_DIR", DEFAULT_SCHEMA_DIR)),
            pooler_region: env::var_or("SUPABASE_POOLER_REGION", DEFAULT_POOLER_REGION),
            connect_timeout_secs: env::parse_or(
                "INMO_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
            http_timeout_secs: env::parse_or("INMO_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?,
            rest_batch_size: env::parse_or("INMO_REST_BATCH_SIZE", DEFAULT_REST_BATCH_SIZE)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rest_batch_size == 0 {
            return Err(IngestError::config("INMO_REST_BATCH_SIZE must be greater than 0"));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(IngestError::config("data directory cannot be empty"));
        }

        if self.pooler_region.trim().is_empty() {
            return Err(IngestError::config("SUPABASE_POOLER_REGION cannot be empty"));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Credentials for the REST data API
#[derive(Clone, PartialEq, Eq)]
pub struct RestCredentials {
    pub base_url: String,
    pub service_key: String,
}

impl std::fmt::Debug for RestCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestCredentials")
            .field("base_url", &self.base_url)
            .field("service_key", &"<redacted>")
            .finish()
    }
}

impl RestCredentials {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        }
    }

    /// Read `SUPABASE_URL` and `SUPABASE_SERVICE_KEY`; both are required.
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("SUPABASE_URL");
        let service_key = env::var("SUPABASE_SERVICE_KEY");

        match (base_url, service_key) {
            (Some(url), Some(key)) => Ok(Self::new(url, key)),
            (url, key) => {
                let mut missing = Vec::new();
                if url.is_none() {
                    missing.push("SUPABASE_URL");
                }
                if key.is_none() {
                    missing.push("SUPABASE_SERVICE_KEY");
                }
                Err(IngestError::config(format!("missing {}", missing.join(" and "))))
            },
        }
    }
}
