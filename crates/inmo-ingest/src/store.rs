//! Postgres store over a single connection
//!
//! One [`PgStore`] serves a whole run: the provisioner and the direct loader
//! use it one after the other, never concurrently.

use crate::direct::{copy_statement, LoadTarget};
use crate::error::Result;
use crate::schema::{SchemaCatalog, TableRef};
use crate::tables::{
    quote_ident, GEOMETRY_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN, PRIMARY_TABLE,
};
use async_trait::async_trait;
use sqlx::{Connection, Executor, PgConnection};
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Bytes sent per `COPY` data message
pub const COPY_CHUNK_BYTES: usize = 64 * 1024;

pub struct PgStore {
    conn: PgConnection,
}

impl PgStore {
    pub fn new(conn: PgConnection) -> Self {
        Self { conn }
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}

/// Stream the file at `path` into an open `COPY ... FROM STDIN`
async fn stream_copy(conn: &mut PgConnection, statement: &str, path: &Path) -> Result<u64> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut copy = conn.copy_in_raw(statement).await?;
    let mut buf = vec![0u8; COPY_CHUNK_BYTES];

    loop {
        let n = match file.read(&mut buf).await {
            Ok(n) => n,
            Err(e) => {
                copy.abort(format!("reading {} failed: {}", path.display(), e))
                    .await
                    .ok();
                return Err(e.into());
            },
        };
        if n == 0 {
            break;
        }
        copy.send(&buf[..n]).await?;
    }

    Ok(copy.finish().await?)
}

/// Run a multi-statement script over the simple query protocol
async fn run_script(conn: &mut PgConnection, sql: &str) -> Result<()> {
    conn.execute(sql).await?;
    Ok(())
}

fn backfill_statement() -> String {
    format!(
        "UPDATE {table} SET {geom} = ST_SetSRID(ST_MakePoint({lon}, {lat}), 4326) \
         WHERE {geom} IS NULL AND {lon} IS NOT NULL AND {lat} IS NOT NULL",
        table = quote_ident(PRIMARY_TABLE),
        geom = quote_ident(GEOMETRY_COLUMN),
        lon = quote_ident(LONGITUDE_COLUMN),
        lat = quote_ident(LATITUDE_COLUMN),
    )
}

#[async_trait]
impl LoadTarget for PgStore {
    async fn copy_csv(&mut self, table: &str, columns: &[String], path: &Path) -> Result<u64> {
        let statement = copy_statement(table, columns);
        debug!(statement = %statement, "Starting COPY");

        let mut tx = self.conn.begin().await?;
        match stream_copy(&mut *tx, &statement, path).await {
            Ok(rows) => {
                tx.commit().await?;
                Ok(rows)
            },
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, table = %table, "Rollback failed");
                }
                Err(e)
            },
        }
    }

    async fn row_count(&mut self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let total: i64 = sqlx::query_scalar(&sql).fetch_one(&mut self.conn).await?;
        Ok(total)
    }

    async fn backfill_points(&mut self) -> Result<u64> {
        let result = sqlx::query(&backfill_statement()).execute(&mut self.conn).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SchemaCatalog for PgStore {
    async fn table_exists(&mut self, table: &TableRef) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM information_schema.tables
                WHERE table_schema = $1 AND table_name = $2
            )
            "#,
        )
        .bind(&table.schema)
        .bind(&table.name)
        .fetch_one(&mut self.conn)
        .await?;
        Ok(exists)
    }

    async fn apply_script(&mut self, sql: &str) -> Result<()> {
        let mut tx = self.conn.begin().await?;
        run_script(&mut tx, sql).await?;
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backfill_statement() {
        let sql = backfill_statement();
        assert!(sql.starts_with(r#"UPDATE "final_num" SET "geom" = ST_SetSRID"#));
        assert!(sql.contains(r#""geom" IS NULL AND "longitud" IS NOT NULL AND "latitud" IS NOT NULL"#));
    }
}
