//! `inmo-ingest rest` command implementation

use crate::config::{IngestConfig, RestCredentials};
use crate::connection::Route;
use crate::discovery;
use crate::error::Result;
use crate::rest::{BatchPlan, RestClient, RestLoader, RestOptions};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

pub struct RestArgs {
    pub data_dir: Option<PathBuf>,
    pub periods: Vec<String>,
    pub dry_run: bool,
    pub replace_period: bool,
}

pub async fn run(config: &IngestConfig, args: RestArgs) -> Result<()> {
    let data_dir = args.data_dir.unwrap_or_else(|| config.data_dir.clone());
    let periods = (!args.periods.is_empty()).then_some(args.periods.as_slice());
    let options = RestOptions {
        batch_size: config.rest_batch_size,
        dry_run: args.dry_run,
        replace_period: args.replace_period,
    };

    let loader = if args.dry_run {
        RestLoader::preview(options)
    } else {
        let credentials = RestCredentials::from_env()?;
        let client = RestClient::new(&credentials, config.http_timeout())?;
        info!(route = %Route::Rest, base_url = %client.base_url(), "Using REST data API");
        RestLoader::new(client, options)
    };

    let artifacts = discovery::discover(&data_dir, periods)?;
    let run = loader.run(artifacts).await?;
    run.report.log_summary();

    if args.dry_run {
        print_plan(&run.plan, args.replace_period);
    }
    super::load::print_report(&run.report);
    Ok(())
}

fn print_plan(plan: &[BatchPlan], replace_period: bool) {
    println!("{}", "Dry run plan:".cyan().bold());
    if plan.is_empty() {
        println!("  Nothing to send.");
    }
    for entry in plan {
        println!("{} -> {} ({})", entry.file_name.green(), entry.table, entry.period);
        if replace_period {
            println!("  DELETE where periodo = {}", entry.period);
        }
        println!("  Rows:    {}", entry.rows);
        println!("  Batches: {}", entry.batches.len());
        for (i, size) in entry.batches.iter().enumerate() {
            println!("    #{:<4} {} rows", i + 1, size);
        }
    }
    println!();
}
