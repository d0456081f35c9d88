//! `inmo-ingest schema` command implementation

use crate::config::IngestConfig;
use crate::error::Result;
use crate::schema::{self, ScriptOutcome, ScriptReport};
use colored::Colorize;
use std::path::Path;

/// Connect, then apply the DDL scripts in `schema_dir`
pub async fn run(config: &IngestConfig, schema_dir: Option<&Path>) -> Result<()> {
    let schema_dir = schema_dir.unwrap_or(config.schema_dir.as_path());
    let mut store = super::connect_store(config).await?;

    let result = provision_dir(&mut store, schema_dir).await;
    store.close().await?;
    let reports = result?;

    print_reports(&reports);
    Ok(())
}

pub(crate) async fn provision_dir<C>(catalog: &mut C, dir: &Path) -> Result<Vec<ScriptReport>>
where
    C: schema::SchemaCatalog,
{
    let scripts = schema::load_scripts(dir)?;
    schema::provision(catalog, &scripts).await
}

pub(crate) fn print_reports(reports: &[ScriptReport]) {
    if reports.is_empty() {
        println!("No schema scripts found.");
        return;
    }

    println!("{}", "Schema:".cyan().bold());
    for report in reports {
        match &report.outcome {
            ScriptOutcome::Applied { created, existing } => {
                println!("  {} {}", "applied".green(), report.script);
                for table in created {
                    println!("    {} {}", "applied".green(), table);
                }
                for table in existing {
                    println!("    {} {} (exists)", "skipped".yellow(), table);
                }
            },
            ScriptOutcome::SkippedExists { tables } => {
                println!("  {} {} ({} exist)", "skipped".yellow(), report.script, tables.join(", "))
            },
        }
    }
    println!();
}
