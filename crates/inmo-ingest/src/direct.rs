//! Direct bulk loader
//!
//! Streams each validated artifact into its table with `COPY ... FROM STDIN`
//! over a single connection. Every artifact is its own transaction: a failed
//! load is rolled back and logged, and the run moves on to the next one.
//! Once all artifacts are processed the point geometry of the numeric facts
//! table is backfilled from its coordinates.
//!
//! Loading the same file twice inserts its rows twice; nothing here
//! deduplicates.

use crate::discovery::{self, Artifact};
use crate::error::Result;
use crate::outcome::{LoadOutcome, LoadReport};
use crate::validation::{self, ColumnCheck};
use async_trait::async_trait;
use std::path::Path;
use tracing::{error, info, warn};

/// Store operations the direct loader needs
#[async_trait]
pub trait LoadTarget: Send {
    /// Bulk-copy the CSV at `path` (header included) into `table` within a
    /// single transaction. Rolls back on any error. Returns rows copied.
    async fn copy_csv(&mut self, table: &str, columns: &[String], path: &Path) -> Result<u64>;

    async fn row_count(&mut self, table: &str) -> Result<i64>;

    /// Fill missing point geometries from longitude/latitude pairs
    async fn backfill_points(&mut self) -> Result<u64>;
}

pub struct DirectLoader<T> {
    target: T,
}

impl<T: LoadTarget> DirectLoader<T> {
    pub fn new(target: T) -> Self {
        Self { target }
    }

    pub fn into_inner(self) -> T {
        self.target
    }

    /// Load `artifacts` in table priority order. Never fails as a whole;
    /// per-artifact problems end up in the report.
    pub async fn run(&mut self, mut artifacts: Vec<Artifact>) -> LoadReport {
        discovery::sort_by_priority(&mut artifacts);
        let mut report = LoadReport::new();

        info!(artifacts = artifacts.len(), "Starting direct load");
        for artifact in artifacts {
            let outcome = self.load_artifact(&artifact, &mut report).await;
            report.record(artifact, outcome);
        }

        match self.target.backfill_points().await {
            Ok(updated) => info!(outcome = "apply", rows = updated, "Point geometry backfilled"),
            Err(e) => report.warn(format!("geometry backfill failed: {}", e)),
        }

        report
    }

    async fn load_artifact(&mut self, artifact: &Artifact, report: &mut LoadReport) -> LoadOutcome {
        let header = match validation::read_header(&artifact.path) {
            Ok(header) => header,
            Err(e) => {
                error!(outcome = "error", file = %artifact.file_name, error = %e, "Cannot read header");
                return LoadOutcome::Failed {
                    error: e.to_string(),
                };
            },
        };

        if let ColumnCheck::Missing(missing) = validation::check_header(&artifact.table, &header) {
            warn!(
                outcome = "skip",
                file = %artifact.file_name,
                table = %artifact.table,
                missing = %missing.join(", "),
                "Missing required columns, artifact skipped"
            );
            return LoadOutcome::SkippedInvalidColumns { missing };
        }

        match self.target.copy_csv(&artifact.table, &header, &artifact.path).await {
            Ok(rows) => {
                info!(
                    outcome = "apply",
                    file = %artifact.file_name,
                    table = %artifact.table,
                    period = %artifact.period,
                    rows = rows,
                    "Artifact loaded"
                );
                match self.target.row_count(&artifact.table).await {
                    Ok(total) => {
                        info!(outcome = "info", table = %artifact.table, total = total, "Table total");
                        report.set_total(&artifact.table, total);
                    },
                    Err(e) => report.warn(format!("row count for {} failed: {}", artifact.table, e)),
                }
                LoadOutcome::Applied { rows }
            },
            Err(e) => {
                error!(
                    outcome = "error",
                    file = %artifact.file_name,
                    table = %artifact.table,
                    error = %e,
                    "Load failed, transaction rolled back"
                );
                LoadOutcome::Failed {
                    error: e.to_string(),
                }
            },
        }
    }
}

/// `COPY` statement for a CSV with a header row.
///
/// Header names fold to lower case, as they would in an unquoted column list.
pub fn copy_statement(table: &str, columns: &[String]) -> String {
    let columns: Vec<String> = columns
        .iter()
        .map(|c| crate::tables::quote_ident(&c.to_lowercase()))
        .collect();
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv, HEADER true)",
        crate::tables::quote_ident(table),
        columns.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_statement() {
        let columns = vec!["id".to_string(), "precio".to_string()];
        assert_eq!(
            copy_statement("final_num", &columns),
            r#"COPY "final_num" ("id", "precio") FROM STDIN WITH (FORMAT csv, HEADER true)"#
        );
    }

    #[test]
    fn test_copy_statement_folds_header_case() {
        let columns = vec!["id".to_string(), "Latitud".to_string(), "AREA_M2".to_string()];
        assert_eq!(
            copy_statement("final_num", &columns),
            r#"COPY "final_num" ("id", "latitud", "area_m2") FROM STDIN WITH (FORMAT csv, HEADER true)"#
        );
    }
}
