//! Per-artifact outcomes and the run report
//!
//! Schema scripts report their own "skipped because it exists" result, see
//! [`crate::schema::ScriptOutcome`]. Outcomes are not persisted. They are logged as they happen (with an
//! `outcome` field) and summarised once at the end of a run.

use crate::discovery::Artifact;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// What happened to one unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    Applied { rows: u64 },
    SkippedInvalidColumns { missing: Vec<String> },
    Failed { error: String },
}

impl LoadOutcome {
    /// Console tag for the outcome category
    pub fn tag(&self) -> &'static str {
        match self {
            LoadOutcome::Applied { .. } => "apply",
            LoadOutcome::SkippedInvalidColumns { .. } => "skip",
            LoadOutcome::Failed { .. } => "error",
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, LoadOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactResult {
    pub artifact: Artifact,
    pub outcome: LoadOutcome,
}

/// Summary of one loader run
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub started_at: DateTime<Utc>,
    pub results: Vec<ArtifactResult>,
    /// Last observed row count per table
    pub table_totals: BTreeMap<String, i64>,
    pub warnings: Vec<String>,
}

impl Default for LoadReport {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            results: Vec::new(),
            table_totals: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record(&mut self, artifact: Artifact, outcome: LoadOutcome) {
        self.results.push(ArtifactResult { artifact, outcome });
    }

    pub fn set_total(&mut self, table: &str, total: i64) {
        self.table_totals.insert(table.to_string(), total);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(outcome = "warning", "{}", message);
        self.warnings.push(message);
    }

    pub fn applied(&self) -> usize {
        self.count(|o| o.is_applied())
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| o.tag() == "skip")
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, LoadOutcome::Failed { .. }))
    }

    /// Rows written across all applied artifacts
    pub fn rows_applied(&self) -> u64 {
        self.results
            .iter()
            .filter_map(|r| match r.outcome {
                LoadOutcome::Applied { rows } => Some(rows),
                _ => None,
            })
            .sum()
    }

    fn count(&self, pred: impl Fn(&LoadOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn log_summary(&self) {
        let elapsed = Utc::now() - self.started_at;
        info!(
            outcome = "info",
            artifacts = self.results.len(),
            applied = self.applied(),
            skipped = self.skipped(),
            failed = self.failed(),
            rows = self.rows_applied(),
            warnings = self.warnings.len(),
            elapsed_ms = elapsed.num_milliseconds(),
            "Run finished"
        );
        for (table, total) in &self.table_totals {
            info!(outcome = "info", table = %table, total = total, "Table row count");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn artifact(name: &str) -> Artifact {
        Artifact {
            path: PathBuf::from(name),
            table: "final_num".to_string(),
            period: "Sep25".to_string(),
            file_name: name.to_string(),
        }
    }

    #[test]
    fn test_counts() {
        let mut report = LoadReport::new();
        report.record(artifact("a"), LoadOutcome::Applied { rows: 10 });
        report.record(artifact("b"), LoadOutcome::Applied { rows: 5 });
        report.record(
            artifact("c"),
            LoadOutcome::SkippedInvalidColumns {
                missing: vec!["precio".to_string()],
            },
        );
        report.record(
            artifact("d"),
            LoadOutcome::Failed {
                error: "boom".to_string(),
            },
        );

        assert_eq!(report.applied(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.rows_applied(), 15);
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let json = serde_json::to_value(LoadOutcome::Applied { rows: 3 }).unwrap_or_default();
        assert_eq!(json["outcome"], "applied");
        assert_eq!(json["rows"], 3);
    }
}
