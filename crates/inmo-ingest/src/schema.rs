//! Schema provisioning
//!
//! Applies the `.sql` scripts of a schema directory in file name order. Each
//! script is inspected for `CREATE TABLE IF NOT EXISTS <name>` statements;
//! when every table it names is already present the script is skipped,
//! otherwise the whole script runs in one transaction. Scripts are written
//! to be re-runnable, so running one whose tables partly exist is safe.
//!
//! The first failing script aborts provisioning: later scripts may depend on
//! tables it was supposed to create.

use crate::error::{IngestError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Schema assumed for unqualified table names
pub const DEFAULT_SCHEMA: &str = "public";

const CREATE_TABLE_PATTERN: &str =
    r#"(?i)create\s+table\s+if\s+not\s+exists\s+((?:"[^"]+"|[\w$]+)(?:\s*\.\s*(?:"[^"]+"|[\w$]+))?)"#;

/// A schema-qualified table name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    /// Parse `name`, `schema.name` or their double-quoted forms. Unquoted
    /// parts fold to lower case the way Postgres folds them.
    pub fn parse(raw: &str) -> Self {
        let parts: Vec<String> = split_qualified(raw).into_iter().map(normalize_part).collect();
        match parts.as_slice() {
            [schema, name] => Self {
                schema: schema.clone(),
                name: name.clone(),
            },
            _ => Self {
                schema: DEFAULT_SCHEMA.to_string(),
                name: parts.last().cloned().unwrap_or_default(),
            },
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

fn split_qualified(raw: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in raw.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => {
                parts.push(raw[start..i].trim());
                start = i + 1;
            },
            _ => {},
        }
    }
    parts.push(raw[start..].trim());
    parts
}

fn normalize_part(part: &str) -> String {
    match part.strip_prefix('"').and_then(|p| p.strip_suffix('"')) {
        Some(quoted) => quoted.replace("\"\"", "\""),
        None => part.to_lowercase(),
    }
}

/// Table names created by a script, in order of first appearance
pub fn extract_table_names(sql: &str) -> Result<Vec<TableRef>> {
    let pattern = Regex::new(CREATE_TABLE_PATTERN)?;
    let mut tables: Vec<TableRef> = Vec::new();
    for captures in pattern.captures_iter(sql) {
        let table = TableRef::parse(&captures[1]);
        if !tables.contains(&table) {
            tables.push(table);
        }
    }
    Ok(tables)
}

/// A schema script read from disk
#[derive(Debug, Clone)]
pub struct SchemaScript {
    pub path: PathBuf,
    pub name: String,
    pub sql: String,
    pub tables: Vec<TableRef>,
}

impl SchemaScript {
    pub fn from_sql(name: impl Into<String>, sql: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let sql = sql.into();
        let tables = extract_table_names(&sql)?;
        Ok(Self {
            path: PathBuf::from(&name),
            name,
            sql,
            tables,
        })
    }
}

/// Read every `.sql` file directly under `dir`, sorted by file name
pub fn load_scripts(dir: &Path) -> Result<Vec<SchemaScript>> {
    if !dir.is_dir() {
        return Err(IngestError::MissingDirectory(dir.to_path_buf()));
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("sql"))
        })
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    paths
        .into_iter()
        .map(|path| {
            let sql = std::fs::read_to_string(&path)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let mut script = SchemaScript::from_sql(name, sql)?;
            script.path = path;
            Ok(script)
        })
        .collect()
}

/// Store operations the provisioner needs
#[async_trait]
pub trait SchemaCatalog: Send {
    async fn table_exists(&mut self, table: &TableRef) -> Result<bool>;

    /// Execute a whole script and commit it
    async fn apply_script(&mut self, sql: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScriptOutcome {
    /// Script ran. `created` lists the tables that were missing beforehand,
    /// `existing` those it names that were already there.
    Applied {
        created: Vec<String>,
        existing: Vec<String>,
    },
    SkippedExists { tables: Vec<String> },
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptReport {
    pub script: String,
    pub outcome: ScriptOutcome,
}

/// Apply `scripts` in the given order.
///
/// A script that names no tables (extensions, indexes) is always applied.
pub async fn provision<C>(catalog: &mut C, scripts: &[SchemaScript]) -> Result<Vec<ScriptReport>>
where
    C: SchemaCatalog + ?Sized,
{
    let mut reports = Vec::with_capacity(scripts.len());

    for script in scripts {
        let mut missing = Vec::new();
        let mut existing = Vec::new();
        for table in &script.tables {
            let exists = catalog
                .table_exists(table)
                .await
                .map_err(|e| schema_error(script, e))?;
            if exists {
                existing.push(table.to_string());
            } else {
                missing.push(table.to_string());
            }
        }

        let outcome = if !script.tables.is_empty() && missing.is_empty() {
            let tables: Vec<String> = script.tables.iter().map(|t| t.to_string()).collect();
            info!(
                outcome = "skip",
                script = %script.name,
                tables = %tables.join(", "),
                "All tables exist, script skipped"
            );
            ScriptOutcome::SkippedExists { tables }
        } else {
            catalog
                .apply_script(&script.sql)
                .await
                .map_err(|e| schema_error(script, e))?;
            for table in &existing {
                info!(outcome = "skip", script = %script.name, table = %table, "Table already exists");
            }
            for table in &missing {
                info!(outcome = "apply", script = %script.name, table = %table, "Table created");
            }
            info!(outcome = "apply", script = %script.name, "Schema script applied");
            ScriptOutcome::Applied {
                created: missing,
                existing,
            }
        };

        reports.push(ScriptReport {
            script: script.name.clone(),
            outcome,
        });
    }

    Ok(reports)
}

fn schema_error(script: &SchemaScript, err: IngestError) -> IngestError {
    match err {
        IngestError::Schema { .. } => err,
        other => IngestError::Schema {
            script: script.name.clone(),
            message: other.to_string(),
        },
    }
}
