//! Destination tables known to the pipeline
//!
//! The mapping from export file names to tables is fixed at compile time.
//! Order in [`TABLES`] is both the prefix matching order and the load
//! priority: numeric facts first, then amenities, marketing and finally the
//! representative-methods tables that reference them.

/// Column holding the reporting period label in every table
pub const PERIOD_COLUMN: &str = "periodo";

/// Table whose rows carry coordinates and a point geometry
pub const PRIMARY_TABLE: &str = "final_num";

pub const LONGITUDE_COLUMN: &str = "longitud";
pub const LATITUDE_COLUMN: &str = "latitud";
pub const GEOMETRY_COLUMN: &str = "geom";

/// A destination table and how artifacts are routed to it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSpec {
    /// Literal, case-sensitive file name prefix
    pub prefix: &'static str,
    pub table: &'static str,
    /// Columns that must appear in the header; empty means not checked
    pub required_columns: &'static [&'static str],
}

pub const TABLES: &[TableSpec] = &[
    TableSpec {
        prefix: "0.Final_Num_",
        table: "final_num",
        required_columns: &["id", "precio", "area_m2", "ciudad", "colonia", "periodo"],
    },
    TableSpec {
        prefix: "1.Final_Amenidades_",
        table: "final_amenidades",
        required_columns: &["id", "periodo"],
    },
    TableSpec {
        prefix: "2.Final_Marketing_",
        table: "final_marketing",
        required_columns: &["id", "periodo"],
    },
    TableSpec {
        prefix: "3.Metodos_Representativos_Colonia_",
        table: "metodos_representativos_colonia",
        required_columns: &[],
    },
    TableSpec {
        prefix: "4.Metodos_Representativos_Ciudad_",
        table: "metodos_representativos_ciudad",
        required_columns: &[],
    },
];

/// First spec in `tables` whose prefix starts `file_name`
pub fn match_prefix<'t>(file_name: &str, tables: &'t [TableSpec]) -> Option<&'t TableSpec> {
    tables.iter().find(|spec| file_name.starts_with(spec.prefix))
}

/// Look up a table by name
pub fn spec_for(table: &str) -> Option<&'static TableSpec> {
    TABLES.iter().find(|spec| spec.table == table)
}

/// Load priority; unknown tables sort after every known one
pub fn priority(table: &str) -> usize {
    TABLES
        .iter()
        .position(|spec| spec.table == table)
        .unwrap_or(TABLES.len())
}

/// Registered required columns, `None` when the table opts out of checking
pub fn required_columns(table: &str) -> Option<&'static [&'static str]> {
    spec_for(table)
        .map(|spec| spec.required_columns)
        .filter(|cols| !cols.is_empty())
}

/// Double-quote an identifier for interpolation into SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
