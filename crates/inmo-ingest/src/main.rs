//! inmo-ingest - main entry point

use clap::Parser;
use inmo_common::logging::{init_logging, LogConfig, LogLevel};
use inmo_ingest::commands::{load::LoadArgs, rest::RestArgs};
use inmo_ingest::{Cli, Commands, IngestConfig};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // .env first so LOG_* variables from it are seen
    dotenvy::dotenv().ok();

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    let log_config = LogConfig::new("inmo-ingest").with_level(level);
    let log_config = match log_config.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring logging environment: {}", e);
            log_config
        },
    };

    // Buffered file logs are flushed when the guard drops
    let guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        },
    };

    if let Err(e) = execute_command(cli).await {
        error!(outcome = "error", error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        drop(guard);
        process::exit(1);
    }
}

async fn execute_command(cli: Cli) -> anyhow::Result<()> {
    let config = IngestConfig::load()?;

    match cli.command {
        Commands::Probe => inmo_ingest::commands::probe::run(&config).await?,

        Commands::Schema { schema_dir } => {
            inmo_ingest::commands::schema::run(&config, schema_dir.as_deref()).await?
        },

        Commands::Load {
            data_dir,
            periods,
            schema_dir,
            skip_schema,
        } => {
            let args = LoadArgs {
                data_dir,
                periods,
                schema_dir,
                skip_schema,
            };
            inmo_ingest::commands::load::run(&config, args).await?
        },

        Commands::Rest {
            data_dir,
            periods,
            dry_run,
            replace_period,
        } => {
            let args = RestArgs {
                data_dir,
                periods,
                dry_run,
                replace_period,
            };
            inmo_ingest::commands::rest::run(&config, args).await?
        },
    }

    Ok(())
}
