//! `inmo-ingest load` command implementation
//!
//! Probe, provision unless told not to, discover, then COPY everything over
//! one connection. Per-artifact failures do not change the exit code.

use crate::config::IngestConfig;
use crate::direct::DirectLoader;
use crate::discovery;
use crate::error::Result;
use crate::outcome::LoadReport;
use colored::Colorize;
use std::path::PathBuf;

pub struct LoadArgs {
    pub data_dir: Option<PathBuf>,
    pub periods: Vec<String>,
    pub schema_dir: Option<PathBuf>,
    pub skip_schema: bool,
}

pub async fn run(config: &IngestConfig, args: LoadArgs) -> Result<()> {
    let data_dir = args.data_dir.unwrap_or_else(|| config.data_dir.clone());
    let schema_dir = args.schema_dir.unwrap_or_else(|| config.schema_dir.clone());
    let periods = (!args.periods.is_empty()).then_some(args.periods.as_slice());

    // Discover before connecting so a bad directory fails fast
    let artifacts = discovery::discover(&data_dir, periods)?;

    let mut store = super::connect_store(config).await?;

    if !args.skip_schema {
        match super::schema::provision_dir(&mut store, &schema_dir).await {
            Ok(reports) => super::schema::print_reports(&reports),
            Err(e) => {
                store.close().await.ok();
                return Err(e);
            },
        }
    }

    let mut loader = DirectLoader::new(store);
    let report = loader.run(artifacts).await;
    report.log_summary();
    loader.into_inner().close().await?;

    print_report(&report);
    Ok(())
}

pub(crate) fn print_report(report: &LoadReport) {
    println!("{}", "Artifacts:".cyan().bold());
    for result in &report.results {
        let tag = match result.outcome.tag() {
            "apply" => "apply".green(),
            "skip" => "skip".yellow(),
            other => other.red(),
        };
        println!("  {} {} -> {}", tag, result.artifact.file_name, result.artifact.table);
    }
    println!();

    if !report.table_totals.is_empty() {
        println!("{}", "Table totals:".cyan().bold());
        for (table, total) in &report.table_totals {
            println!("  {:<36} {}", table, total);
        }
        println!();
    }

    for warning in &report.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }

    println!("{}", "Summary:".cyan().bold());
    println!("  Applied: {}", report.applied());
    println!("  Skipped: {}", report.skipped());
    println!("  Failed:  {}", report.failed());
    println!("  Rows:    {}", report.rows_applied());
}
