//! Listing ingestion pipeline
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Loads the monthly real-estate listing exports (numeric facts, amenities,
//! marketing text and representative-method aggregates) into the hosted
//! Postgres store.
//!
//! # Overview
//!
//! - **Connectivity**: route probing with the session pooler fallback
//!   ([`probe`], [`connection`])
//! - **Schema**: idempotent DDL provisioning ([`schema`])
//! - **Discovery and validation**: file-to-table mapping, period labels and
//!   required-column checks ([`discovery`], [`validation`], [`tables`])
//! - **Loading**: `COPY` over a direct connection ([`direct`], [`store`]) or
//!   batched inserts through the REST data API ([`rest`])
//!
//! Everything runs sequentially over at most one database connection.

pub mod commands;
pub mod config;
pub mod connection;
pub mod direct;
pub mod discovery;
pub mod error;
pub mod outcome;
pub mod probe;
pub mod rest;
pub mod schema;
pub mod store;
pub mod tables;
pub mod validation;

pub use config::{IngestConfig, RestCredentials};
pub use connection::{ConnectionDescriptor, Route};
pub use discovery::Artifact;
pub use error::{IngestError, Result};
pub use outcome::{LoadOutcome, LoadReport};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Listing ingestion: provision the schema and load monthly exports
#[derive(Parser, Debug)]
#[command(name = "inmo-ingest")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check which route reaches the database
    Probe,

    /// Apply DDL scripts, skipping those whose tables already exist
    Schema {
        /// Directory with .sql scripts (defaults to INMO_SCHEMA_DIR)
        #[arg(long)]
        schema_dir: Option<PathBuf>,
    },

    /// Bulk-load artifacts over a direct database connection
    Load {
        /// Directory with the CSV exports (defaults to INMO_DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Only load these period labels (e.g. Sep25)
        #[arg(long = "periodos", num_args = 1..)]
        periods: Vec<String>,

        /// Directory with .sql scripts (defaults to INMO_SCHEMA_DIR)
        #[arg(long)]
        schema_dir: Option<PathBuf>,

        /// Do not run schema provisioning first
        #[arg(long)]
        skip_schema: bool,
    },

    /// Load artifacts through the REST data API in batches
    Rest {
        /// Directory with the CSV exports (defaults to INMO_DATA_DIR)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Only load these period labels (e.g. Sep25)
        #[arg(long = "periodos", num_args = 1..)]
        periods: Vec<String>,

        /// Print the batch plan without sending anything
        #[arg(long)]
        dry_run: bool,

        /// Delete rows of each artifact's period before inserting
        #[arg(long = "replace-periodo")]
        replace_period: bool,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_rest_flags() {
        let cli = Cli::try_parse_from([
            "inmo-ingest",
            "rest",
            "--periodos",
            "Sep25",
            "Oct25",
            "--dry-run",
            "--replace-periodo",
        ])
        .unwrap();

        match cli.command {
            Commands::Rest {
                periods,
                dry_run,
                replace_period,
                data_dir,
            } => {
                assert_eq!(periods, vec!["Sep25".to_string(), "Oct25".to_string()]);
                assert!(dry_run);
                assert!(replace_period);
                assert!(data_dir.is_none());
            },
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_load_global_verbose() {
        let cli = Cli::try_parse_from(["inmo-ingest", "load", "--skip-schema", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Load { skip_schema: true, .. }));
    }
}
