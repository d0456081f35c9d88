//! REST batch loader
//!
//! Same discovery, ordering and column gate as the direct loader, different
//! transport and failure policy: the first non-2xx answer ends the run,
//! since it almost always means a credential or network problem that every
//! following request would hit too.
//!
//! Batches are independent requests. If a run dies halfway, the batches
//! already accepted stay in the table.

use super::client::RestClient;
use super::Row;
use crate::config::DEFAULT_REST_BATCH_SIZE;
use crate::discovery::{self, Artifact};
use crate::error::{IngestError, Result};
use crate::outcome::{LoadOutcome, LoadReport};
use crate::validation::{self, ColumnCheck};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestOptions {
    pub batch_size: usize,
    /// Plan only, no network calls
    pub dry_run: bool,
    /// Delete the artifact's period from the table before inserting
    pub replace_period: bool,
}

impl Default for RestOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_REST_BATCH_SIZE,
            dry_run: false,
            replace_period: false,
        }
    }
}

/// What would be (or was) sent for one artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchPlan {
    pub table: String,
    pub file_name: String,
    pub period: String,
    pub rows: usize,
    /// Row count of each POST, in send order
    pub batches: Vec<usize>,
}

#[derive(Debug)]
pub struct RestRun {
    pub report: LoadReport,
    pub plan: Vec<BatchPlan>,
}

/// Sizes of the batches needed to send `total` rows, `chunk` at a time
pub fn batch_sizes(total: usize, chunk: usize) -> Vec<usize> {
    if chunk == 0 {
        return Vec::new();
    }
    let full = total / chunk;
    let mut sizes = vec![chunk; full];
    if total % chunk != 0 {
        sizes.push(total % chunk);
    }
    sizes
}

/// Read a whole CSV into JSON rows keyed by header name. Empty fields
/// become `null`.
pub fn read_rows(path: &Path) -> Result<Vec<Row>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let header: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Row = header
            .iter()
            .zip(record.iter())
            .map(|(name, field)| {
                let value = if field.is_empty() {
                    Value::Null
                } else {
                    Value::String(field.to_string())
                };
                (name.clone(), value)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

pub struct RestLoader {
    client: Option<RestClient>,
    options: RestOptions,
}

impl RestLoader {
    pub fn new(client: RestClient, options: RestOptions) -> Self {
        Self {
            client: Some(client),
            options,
        }
    }

    /// Loader that can only plan; needs no credentials
    pub fn preview(options: RestOptions) -> Self {
        Self {
            client: None,
            options: RestOptions {
                dry_run: true,
                ..options
            },
        }
    }

    /// Load `artifacts` in table priority order.
    ///
    /// Returns an error, after logging the partial summary, as soon as the
    /// API rejects a request.
    pub async fn run(&self, mut artifacts: Vec<Artifact>) -> Result<RestRun> {
        if self.options.batch_size == 0 {
            return Err(IngestError::config("REST batch size must be greater than 0"));
        }
        let client = match (&self.client, self.options.dry_run) {
            (_, true) => None,
            (Some(client), false) => Some(client),
            (None, false) => {
                return Err(IngestError::config(
                    "SUPABASE_URL and SUPABASE_SERVICE_KEY are required unless --dry-run is set",
                ))
            },
        };

        discovery::sort_by_priority(&mut artifacts);
        let mut report = LoadReport::new();
        let mut plan = Vec::new();

        info!(
            artifacts = artifacts.len(),
            dry_run = self.options.dry_run,
            replace_period = self.options.replace_period,
            batch_size = self.options.batch_size,
            "Starting REST load"
        );

        for artifact in artifacts {
            match validation::validate_artifact(&artifact) {
                Ok(ColumnCheck::Valid) => {},
                Ok(ColumnCheck::Missing(missing)) => {
                    warn!(
                        outcome = "skip",
                        file = %artifact.file_name,
                        table = %artifact.table,
                        missing = %missing.join(", "),
                        "Missing required columns, artifact skipped"
                    );
                    report.record(artifact, LoadOutcome::SkippedInvalidColumns { missing });
                    continue;
                },
                Err(e) => {
                    error!(outcome = "error", file = %artifact.file_name, error = %e, "Cannot read header");
                    report.record(artifact, LoadOutcome::Failed { error: e.to_string() });
                    continue;
                },
            }

            let rows = match read_rows(&artifact.path) {
                Ok(rows) => rows,
                Err(e) => {
                    error!(outcome = "error", file = %artifact.file_name, error = %e, "Cannot read rows");
                    report.record(artifact, LoadOutcome::Failed { error: e.to_string() });
                    continue;
                },
            };

            let entry = BatchPlan {
                table: artifact.table.clone(),
                file_name: artifact.file_name.clone(),
                period: artifact.period.clone(),
                rows: rows.len(),
                batches: batch_sizes(rows.len(), self.options.batch_size),
            };

            match client {
                None => log_planned(&entry, self.options.replace_period),
                Some(client) => {
                    if let Err(e) = self.send(client, &artifact, &rows, &entry, &mut report).await {
                        error!(
                            outcome = "error",
                            file = %artifact.file_name,
                            table = %artifact.table,
                            error = %e,
                            "REST load aborted"
                        );
                        report.record(artifact, LoadOutcome::Failed { error: e.to_string() });
                        report.log_summary();
                        return Err(e);
                    }
                    report.record(artifact, LoadOutcome::Applied { rows: rows.len() as u64 });
                },
            }
            plan.push(entry);
        }

        Ok(RestRun { report, plan })
    }

    async fn send(
        &self,
        client: &RestClient,
        artifact: &Artifact,
        rows: &[Row],
        entry: &BatchPlan,
        report: &mut LoadReport,
    ) -> Result<()> {
        if self.options.replace_period {
            client.delete_period(&artifact.table, &artifact.period).await?;
            info!(
                outcome = "apply",
                table = %artifact.table,
                period = %artifact.period,
                "Existing rows for period deleted"
            );
        }

        let total = entry.batches.len();
        for (i, chunk) in rows.chunks(self.options.batch_size).enumerate() {
            client.insert_batch(&artifact.table, chunk).await?;
            info!(
                outcome = "apply",
                table = %artifact.table,
                batch = i + 1,
                of = total,
                rows = chunk.len(),
                "Batch inserted"
            );
        }

        match client.count_rows(&artifact.table).await {
            Ok(Some(count)) => {
                info!(outcome = "info", table = %artifact.table, total = count, "Table total");
                report.set_total(&artifact.table, count as i64);
            },
            Ok(None) => report.warn(format!("no row total reported for {}", artifact.table)),
            Err(e) => report.warn(format!("row count for {} failed: {}", artifact.table, e)),
        }

        Ok(())
    }
}

fn log_planned(entry: &BatchPlan, replace_period: bool) {
    if replace_period {
        info!(
            outcome = "info",
            table = %entry.table,
            period = %entry.period,
            "Dry run: would delete existing rows for period"
        );
    }
    let total = entry.batches.len();
    for (i, size) in entry.batches.iter().enumerate() {
        info!(
            outcome = "info",
            table = %entry.table,
            file = %entry.file_name,
            batch = i + 1,
            of = total,
            rows = size,
            "Dry run: batch would be sent"
        );
    }
}
