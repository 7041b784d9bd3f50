// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Integration tests for the CLI handlers

use std::io::Write;
use std::time::Duration;

use ddlbatch::{ConnectionOptions, InMemoryDdlClient};
use ddlbatch_cli::cli::handlers::{classify_script, load_options, load_script, run_script};
use ddlbatch_cli::cli::{handle_classify, handle_run, CliError, OutputFormat};
use tempfile::NamedTempFile;

const SCHEMA: &str = "
-- Music schema
CREATE TABLE Singers (
    SingerId INT64 NOT NULL,
    Name     STRING(MAX)
) PRIMARY KEY (SingerId);

CREATE TABLE Albums (
    AlbumId INT64 NOT NULL
) PRIMARY KEY (AlbumId);

/* lookups */
CREATE INDEX AlbumsById ON Albums (AlbumId);
";

fn script_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write script");
    file
}

#[tokio::test]
async fn test_run_script_applies_all_statements() {
    let report = run_script(SCHEMA, ConnectionOptions::default(), InMemoryDdlClient::new())
        .await
        .unwrap();

    assert!(report.succeeded());
    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.applied_count(), 3);
    assert_eq!(report.schema.len(), 3);
    assert!(report.outcomes[0].statement.starts_with("CREATE TABLE Singers"));
}

#[tokio::test]
async fn test_run_script_reports_partial_failure() {
    let script = format!("{}\nCREATE TABLE Singers (Id INT64) PRIMARY KEY (Id);\nDROP TABLE Albums;", SCHEMA);
    let report = run_script(&script, ConnectionOptions::default(), InMemoryDdlClient::new())
        .await
        .unwrap();

    assert!(!report.succeeded());
    let counts: Vec<i64> = report.outcomes.iter().map(|o| o.update_count).collect();
    assert_eq!(counts, vec![1, 1, 1, 0, 0]);
    assert!(report.error.as_deref().unwrap_or_default().contains("ALREADY_EXISTS"));
}

#[tokio::test]
async fn test_run_script_rejects_batch_control_statements() {
    let result = run_script(
        "CREATE TABLE A (Id INT64) PRIMARY KEY (Id); RUN BATCH",
        ConnectionOptions::default(),
        InMemoryDdlClient::new(),
    )
    .await;
    assert!(matches!(result, Err(CliError::Script(_))));
}

#[tokio::test]
async fn test_run_script_rejects_queries() {
    let ddl_client = InMemoryDdlClient::new();
    let result = run_script(
        "CREATE TABLE A (Id INT64) PRIMARY KEY (Id); SELECT * FROM A",
        ConnectionOptions::default(),
        ddl_client.clone(),
    )
    .await;
    assert!(matches!(result, Err(CliError::Connection(_))));
    assert!(ddl_client.submissions().is_empty());
}

#[tokio::test]
async fn test_script_timeout_applies_to_batch() {
    let report = run_script(
        "SET STATEMENT_TIMEOUT = '20ms'; CREATE TABLE A (Id INT64) PRIMARY KEY (Id)",
        ConnectionOptions::default().with_cancel_grace_period(Duration::from_secs(1)),
        InMemoryDdlClient::new().with_statement_delay(Duration::from_millis(500)),
    )
    .await
    .unwrap();

    assert!(report.error.as_deref().unwrap_or_default().contains("DEADLINE_EXCEEDED"));
    assert_eq!(report.outcomes[0].update_count, 0);
}

#[test]
fn test_classify_script() {
    let classifications =
        classify_script("CREATE TABLE A (Id INT64) PRIMARY KEY (Id); SELECT 1; START BATCH DDL")
            .unwrap();
    let types: Vec<&str> = classifications
        .iter()
        .map(|c| c.statement_type.as_str())
        .collect();
    assert_eq!(types, vec!["DDL", "QUERY", "CLIENT_SIDE"]);
}

#[test]
fn test_load_options_with_override() {
    let config = script_file(r#"{"database": "music", "statement_timeout_ms": 1000}"#);

    let options = load_options(Some(config.path()), None).unwrap();
    assert_eq!(options.database, "music");
    assert_eq!(options.statement_timeout(), Some(Duration::from_secs(1)));

    let options = load_options(Some(config.path()), Some(50)).unwrap();
    assert_eq!(options.statement_timeout(), Some(Duration::from_millis(50)));

    assert!(matches!(
        load_options(None, Some(0)),
        Err(CliError::Connection(_))
    ));
}

#[test]
fn test_missing_script_is_io_error() {
    let result = load_script(std::path::Path::new("/nonexistent/schema.sql"));
    assert!(matches!(result, Err(CliError::Io { .. })));
}

#[tokio::test]
async fn test_handle_run_exit_status() {
    let good = script_file(SCHEMA);
    handle_run(good.path().to_path_buf(), None, 0, None, OutputFormat::Json)
        .await
        .unwrap();

    let bad = script_file("CREATE INDEX Orphan ON Missing (Id);");
    let result = handle_run(bad.path().to_path_buf(), None, 0, None, OutputFormat::Table).await;
    assert!(matches!(result, Err(CliError::BatchFailed(_))));
}

#[test]
fn test_handle_classify() {
    let script = script_file(SCHEMA);
    handle_classify(script.path().to_path_buf(), OutputFormat::Table).unwrap();
}
