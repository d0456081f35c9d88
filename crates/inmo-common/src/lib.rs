//! Inmo Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, environment helpers and logging setup for the
//! listing ingestion workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`InmoError`] and the [`Result`] alias
//! - **Environment**: typed lookups of `.env`/process variables ([`env`])
//! - **Logging**: `tracing` subscriber initialisation ([`logging`])
//!
//! # Example
//!
//! ```no_run
//! use inmo_common::{env, Result};
//!
//! fn data_dir() -> Result<String> {
//!     Ok(env::var_or("INMO_DATA_DIR", "./data"))
//! }
//! ```

pub mod env;
pub mod error;
pub mod logging;

pub use error::{InmoError, Result};
