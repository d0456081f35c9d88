//! `inmo-ingest probe` command implementation

use crate::config::IngestConfig;
use crate::connection::ConnectionDescriptor;
use crate::error::{IngestError, Result};
use crate::probe::{ConnectivityProber, PgDialer};
use colored::Colorize;
use sqlx::Connection;

/// Try every route and print what happened
pub async fn run(config: &IngestConfig) -> Result<()> {
    let primary = ConnectionDescriptor::from_env()?;
    let prober = ConnectivityProber::new(
        PgDialer::new(config.connect_timeout()),
        config.pooler_region.clone(),
    );
    let report = prober.probe(&primary).await;

    println!("{}", "Routes:".cyan().bold());
    for attempt in &report.attempts {
        match &attempt.error {
            None => println!(
                "  {} {} {}:{}",
                "ok".green(),
                attempt.route,
                attempt.host,
                attempt.port
            ),
            Some(e) => println!(
                "  {} {} {}:{} ({:?}) {}",
                "failed".red(),
                attempt.route,
                attempt.host,
                attempt.port,
                attempt.stage,
                e
            ),
        }
    }
    println!();

    let summary = report.describe_attempts();
    match (report.state.is_resolved(), report.connection, report.descriptor) {
        (true, Some(conn), Some(descriptor)) => {
            println!("{} {}", "Resolved via".green().bold(), descriptor.route);
            println!("  {}", descriptor.redacted());
            conn.close().await?;
            Ok(())
        },
        _ => Err(IngestError::connectivity(format!("all routes failed: {}", summary))),
    }
}
