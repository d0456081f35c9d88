//! Postgres store tests
//!
//! Need a database: set DATABASE_URL and run with `--ignored`.

use inmo_ingest::direct::{DirectLoader, LoadTarget};
use inmo_ingest::schema::{self, SchemaCatalog, ScriptOutcome, TableRef};
use inmo_ingest::store::PgStore;
use inmo_ingest::{discovery, LoadOutcome};
use sqlx::PgPool;
use tempfile::TempDir;

const FINAL_NUM_DDL: &str = "CREATE TABLE IF NOT EXISTS final_num (
    id bigint,
    precio numeric,
    area_m2 numeric,
    ciudad text,
    colonia text,
    periodo text
);";

async fn store(pool: &PgPool) -> PgStore {
    PgStore::new(pool.acquire().await.unwrap().detach())
}

#[sqlx::test(migrations = false)]
#[ignore] // Requires database
async fn test_provision_then_skip(pool: PgPool) {
    let mut store = store(&pool).await;
    // Two statements in one script go through in a single call
    let sql = format!(
        "{}\nCREATE INDEX IF NOT EXISTS final_num_periodo_idx ON final_num (periodo);",
        FINAL_NUM_DDL
    );
    let scripts = vec![schema::SchemaScript::from_sql("01_final_num.sql", sql).unwrap()];

    let first = schema::provision(&mut store, &scripts).await.unwrap();
    assert!(matches!(first[0].outcome, ScriptOutcome::Applied { .. }));
    assert!(store.table_exists(&TableRef::parse("final_num")).await.unwrap());

    let second = schema::provision(&mut store, &scripts).await.unwrap();
    assert!(matches!(second[0].outcome, ScriptOutcome::SkippedExists { .. }));
}

#[sqlx::test(migrations = false)]
#[ignore] // Requires database
async fn test_copy_and_rollback(pool: PgPool) {
    let mut store = store(&pool).await;
    let scripts = vec![schema::SchemaScript::from_sql("01_final_num.sql", FINAL_NUM_DDL).unwrap()];
    schema::provision(&mut store, &scripts).await.unwrap();

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("0.Final_Num_Sep25.csv"),
        "id,precio,area_m2,ciudad,colonia,periodo\n1,2500000,85,CDMX,Roma,Sep25\n2,3100000,92,CDMX,Condesa,Sep25\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("0.Final_Num_Oct25.csv"),
        "id,precio,area_m2,ciudad,colonia,periodo\n3,not-a-number,60,CDMX,Narvarte,Oct25\n",
    )
    .unwrap();

    let artifacts = discovery::discover(dir.path(), None).unwrap();
    let mut loader = DirectLoader::new(store);
    let report = loader.run(artifacts).await;

    let outcomes: Vec<(&str, &LoadOutcome)> = report
        .results
        .iter()
        .map(|r| (r.artifact.period.as_str(), &r.outcome))
        .collect();
    assert!(matches!(outcomes[0], ("Oct25", LoadOutcome::Failed { .. })));
    assert_eq!(outcomes[1], ("Sep25", &LoadOutcome::Applied { rows: 2 }));

    // The failed file was rolled back
    let mut store = loader.into_inner();
    assert_eq!(store.row_count("final_num").await.unwrap(), 2);

    // No geom column here, so the backfill can only warn
    assert_eq!(report.warnings.len(), 1);
}

#[sqlx::test(migrations = false)]
#[ignore] // Requires database
async fn test_loading_twice_duplicates_rows(pool: PgPool) {
    let mut store = store(&pool).await;
    let scripts = vec![schema::SchemaScript::from_sql("01_final_num.sql", FINAL_NUM_DDL).unwrap()];
    schema::provision(&mut store, &scripts).await.unwrap();

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("0.Final_Num_Sep25.csv"),
        "id,precio,area_m2,ciudad,colonia,periodo\n1,2500000,85,CDMX,Roma,Sep25\n",
    )
    .unwrap();
    let artifacts = discovery::discover(dir.path(), None).unwrap();

    let mut loader = DirectLoader::new(store);
    loader.run(artifacts.clone()).await;
    let second = loader.run(artifacts).await;

    assert_eq!(second.results[0].outcome, LoadOutcome::Applied { rows: 1 });
    let mut store = loader.into_inner();
    assert_eq!(store.row_count("final_num").await.unwrap(), 2);
}
