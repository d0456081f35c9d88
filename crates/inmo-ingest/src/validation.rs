//! Column validation
//!
//! Gate run before any load: the header line of an artifact must contain
//! every required column registered for its table. Only the first line of
//! the file is read.

use crate::discovery::Artifact;
use crate::error::Result;
use crate::tables;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Result of checking an artifact's header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnCheck {
    Valid,
    /// Required names absent from the header, in registration order
    Missing(Vec<String>),
}

impl ColumnCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, ColumnCheck::Valid)
    }
}

/// Read and split the header line of a CSV file.
///
/// Quoted names are unquoted, surrounding whitespace and a leading UTF-8 BOM
/// are removed. An empty file yields an empty header.
pub fn read_header(path: &Path) -> Result<Vec<String>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = String::new();
    reader.read_line(&mut line)?;

    let line = line.trim_start_matches(UTF8_BOM).trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    csv_reader.read_record(&mut record)?;
    Ok(record.iter().map(|name| name.trim().to_string()).collect())
}

/// Required names that do not appear in `header`
pub fn missing_columns(header: &[String], required: &[&str]) -> Vec<String> {
    required
        .iter()
        .filter(|name| !header.iter().any(|h| h == *name))
        .map(|name| name.to_string())
        .collect()
}

/// Check an already-read header against the table's registered columns
pub fn check_header(table: &str, header: &[String]) -> ColumnCheck {
    match tables::required_columns(table) {
        None => ColumnCheck::Valid,
        Some(required) => {
            let missing = missing_columns(header, required);
            if missing.is_empty() {
                ColumnCheck::Valid
            } else {
                ColumnCheck::Missing(missing)
            }
        },
    }
}

/// Validate an artifact. Tables without registered columns pass without
/// opening the file.
pub fn validate_artifact(artifact: &Artifact) -> Result<ColumnCheck> {
    if tables::required_columns(&artifact.table).is_none() {
        return Ok(ColumnCheck::Valid);
    }
    let header = read_header(&artifact.path)?;
    Ok(check_header(&artifact.table, &header))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn artifact(path: PathBuf, table: &str) -> Artifact {
        Artifact {
            file_name: path.file_name().unwrap().to_string_lossy().to_string(),
            path,
            table: table.to_string(),
            period: "Sep25".to_string(),
        }
    }

    #[test]
    fn test_read_header_only_first_line() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "h.csv",
            "\u{feff}id,\"precio\", area_m2\r\n1,2,3\nthis,is,\"not\nparsed",
        );
        assert_eq!(read_header(&path).unwrap(), vec!["id", "precio", "area_m2"]);
    }

    #[test]
    fn test_read_header_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "empty.csv", "");
        assert!(read_header(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_columns_keeps_required_order() {
        let header = vec!["periodo".to_string(), "id".to_string()];
        let missing = missing_columns(&header, &["id", "precio", "area_m2", "periodo"]);
        assert_eq!(missing, vec!["precio", "area_m2"]);
    }

    #[test]
    fn test_validate_artifact_missing() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "0.Final_Num_Sep25.csv", "id,precio,ciudad,periodo\n1,2,x,Sep25\n");
        let check = validate_artifact(&artifact(path, "final_num")).unwrap();
        assert_eq!(
            check,
            ColumnCheck::Missing(vec!["area_m2".to_string(), "colonia".to_string()])
        );
    }

    #[test]
    fn test_validate_artifact_valid() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "0.Final_Num_Sep25.csv",
            "id,precio,area_m2,ciudad,colonia,periodo,extra\n",
        );
        assert!(validate_artifact(&artifact(path, "final_num")).unwrap().is_valid());
    }

    #[test]
    fn test_unregistered_table_skips_io() {
        let missing = PathBuf::from("/does/not/exist.csv");
        let check = validate_artifact(&artifact(missing, "metodos_representativos_colonia"));
        assert_eq!(check.unwrap(), ColumnCheck::Valid);
    }
}
