//! End-to-end tests for the inmo-ingest binary
//!
//! Only paths that need no database: dry-run planning, credential checks
//! and a REST load against a mock data API.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn write_exports(dir: &Path) {
    std::fs::write(
        dir.join("0.Final_Num_Sep25.csv"),
        "id,precio,area_m2,ciudad,colonia,periodo\n1,2500000,85,CDMX,Roma,Sep25\n",
    )
    .unwrap();
    std::fs::write(dir.join("1.Final_Amenidades_Sep25.csv"), "id,periodo\n1,Sep25\n").unwrap();
    std::fs::write(dir.join("notes.csv"), "unrelated\n").unwrap();
}

/// Binary with a clean environment; the temp dir is the working directory
/// so no stray .env is picked up
fn cli(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("inmo-ingest").unwrap();
    cmd.current_dir(workdir)
        .env_remove("SUPABASE_URL")
        .env_remove("SUPABASE_SERVICE_KEY")
        .env_remove("PGURL")
        .env("NO_COLOR", "1")
        .env("LOG_LEVEL", "warn")
        .env("LOG_OUTPUT", "console");
    cmd
}

#[test]
fn test_rest_dry_run_prints_plan() {
    let dir = TempDir::new().unwrap();
    write_exports(dir.path());

    cli(dir.path())
        .arg("rest")
        .arg("--data-dir")
        .arg(dir.path())
        .arg("--dry-run")
        .arg("--replace-periodo")
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run plan"))
        .stdout(predicate::str::contains("0.Final_Num_Sep25.csv"))
        .stdout(predicate::str::contains("DELETE where periodo = Sep25"))
        .stdout(predicate::str::contains("notes.csv").not());
}

#[test]
fn test_rest_without_credentials_fails() {
    let dir = TempDir::new().unwrap();
    write_exports(dir.path());

    cli(dir.path())
        .arg("rest")
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("SUPABASE_URL"));
}

#[test]
fn test_missing_data_dir_fails() {
    let dir = TempDir::new().unwrap();

    cli(dir.path())
        .arg("rest")
        .arg("--data-dir")
        .arg(dir.path().join("nope"))
        .arg("--dry-run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Directory not found"));
}

#[test]
fn test_load_without_connection_settings_fails() {
    let dir = TempDir::new().unwrap();
    write_exports(dir.path());

    cli(dir.path())
        .env_remove("PG_HOST")
        .env_remove("PG_USER")
        .env_remove("PG_PASSWORD")
        .arg("load")
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("PGURL"));
}

#[tokio::test]
async fn test_rest_load_against_mock_api() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    write_exports(dir.path());

    Mock::given(method("POST"))
        .and(header("apikey", "e2e-key"))
        .respond_with(ResponseTemplate::new(201))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/final_num"))
        .respond_with(ResponseTemplate::new(206).insert_header("content-range", "0-0/1"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/final_amenidades"))
        .respond_with(ResponseTemplate::new(206).insert_header("content-range", "0-0/1"))
        .mount(&server)
        .await;

    let uri = server.uri();
    let data_dir = dir.path().to_path_buf();
    let output = tokio::task::spawn_blocking(move || {
        cli(&data_dir)
            .env("SUPABASE_URL", uri)
            .env("SUPABASE_SERVICE_KEY", "e2e-key")
            .arg("rest")
            .arg("--data-dir")
            .arg(&data_dir)
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Applied: 2"));
}
