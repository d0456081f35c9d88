//! Artifact discovery
//!
//! Finds CSV exports in a data directory and works out, from the file name
//! alone, which table each one feeds and which reporting period it covers:
//!
//! ```text
//! 0.Final_Num_Sep25.csv  ->  table final_num, period Sep25
//! ```
//!
//! Classification ([`classify`], [`period_label`], [`plan`]) is pure and never
//! touches the filesystem; [`discover`] only lists the directory and feeds
//! the names through it.

use crate::error::{IngestError, Result};
use crate::tables::{self, TableSpec};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Period label used when a file name carries none
pub const UNKNOWN_PERIOD: &str = "UNK";

/// Extension of loadable exports (compared case-insensitively)
pub const TABULAR_EXTENSION: &str = "csv";

/// A classified export file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub table: String,
    pub period: String,
    pub file_name: String,
}

/// Period label of a file name: the last underscore-delimited token of the
/// stem, or [`UNKNOWN_PERIOD`] when the stem has no underscore. A stem ending
/// in `_` has an empty label.
pub fn period_label(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);

    match stem.rsplit_once('_') {
        Some((_, last)) => last.to_string(),
        None => UNKNOWN_PERIOD.to_string(),
    }
}

/// Destination table for a file name, `None` if no prefix matches
pub fn classify<'t>(file_name: &str, tables: &'t [TableSpec]) -> Option<&'t TableSpec> {
    tables::match_prefix(file_name, tables)
}

fn is_tabular(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(TABULAR_EXTENSION))
}

/// Turn candidate paths into artifacts.
///
/// Paths without a matching prefix, or whose period is not in `periods`
/// (when given), are dropped. Output follows input order.
pub fn plan<I>(paths: I, periods: Option<&[String]>, tables: &[TableSpec]) -> Vec<Artifact>
where
    I: IntoIterator<Item = PathBuf>,
{
    paths
        .into_iter()
        .filter_map(|path| {
            let file_name = path.file_name()?.to_str()?.to_string();
            let period = period_label(&file_name);

            if let Some(allowed) = periods {
                if !allowed.iter().any(|p| p == &period) {
                    debug!(file = %file_name, period = %period, "Period not selected, excluded");
                    return None;
                }
            }

            let Some(spec) = classify(&file_name, tables) else {
                debug!(file = %file_name, "No table prefix matches, excluded");
                return None;
            };

            Some(Artifact {
                path,
                table: spec.table.to_string(),
                period,
                file_name,
            })
        })
        .collect()
}

/// List the CSV files directly under `dir` and classify them against
/// [`tables::TABLES`]. Files are visited in name order so repeated runs over
/// the same directory give the same result.
pub fn discover(dir: &Path, periods: Option<&[String]>) -> Result<Vec<Artifact>> {
    if !dir.is_dir() {
        return Err(IngestError::MissingDirectory(dir.to_path_buf()));
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        // is_file follows symlinks
        if path.is_file() && is_tabular(&path) {
            candidates.push(path);
        }
    }
    candidates.sort();

    let artifacts = plan(candidates, periods, tables::TABLES);
    info!(
        dir = %dir.display(),
        artifacts = artifacts.len(),
        "Discovered artifacts"
    );
    Ok(artifacts)
}

/// Reorder artifacts by table load priority, keeping name order within a table
pub fn sort_by_priority(artifacts: &mut [Artifact]) {
    artifacts.sort_by(|a, b| {
        tables::priority(&a.table)
            .cmp(&tables::priority(&b.table))
            .then_with(|| a.file_name.cmp(&b.file_name))
    });
}
