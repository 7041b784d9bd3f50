// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Integration tests for DDL batch state transitions and guards

mod support;

use std::sync::Arc;

use ddlbatch::{
    AnalyzeMode, ConnectionError, DdlBatch, ErrorCode, Mutation, QueryOption, ServiceError,
    UnitOfWork, UnitOfWorkState,
};
use support::{batch, init_logging, parse, FakeDdlClient};

const TABLES: [&str; 3] = [
    "CREATE TABLE Singers (SingerId INT64 NOT NULL) PRIMARY KEY (SingerId)",
    "CREATE TABLE Albums (AlbumId INT64 NOT NULL) PRIMARY KEY (AlbumId)",
    "CREATE INDEX AlbumsById ON Albums (AlbumId)",
];

/// Batches in each terminal state
async fn terminated_batches() -> Vec<DdlBatch> {
    let mut ran = batch(&Arc::new(FakeDdlClient::succeeding()));
    ran.execute_ddl(&parse(TABLES[0])).unwrap();
    ran.run_batch().await.unwrap();

    let mut failed = batch(&Arc::new(FakeDdlClient::failing(
        ServiceError::new(ErrorCode::AlreadyExists, "Duplicate name in schema: Singers"),
        &[],
    )));
    failed.execute_ddl(&parse(TABLES[0])).unwrap();
    failed.run_batch().await.unwrap_err();

    let mut aborted = batch(&Arc::new(FakeDdlClient::succeeding()));
    aborted.execute_ddl(&parse(TABLES[0])).unwrap();
    aborted.abort_batch().unwrap();

    vec![ran, failed, aborted]
}

#[test]
fn test_appended_statements_keep_their_order() {
    init_logging();

    for length in 0..=TABLES.len() {
        let mut batch = batch(&Arc::new(FakeDdlClient::succeeding()));
        for sql in &TABLES[..length] {
            batch.execute_ddl(&parse(sql)).unwrap();
        }
        let expected: Vec<String> = TABLES[..length].iter().map(|s| s.to_string()).collect();
        assert_eq!(batch.statements(), expected.as_slice());
        assert_eq!(batch.state(), UnitOfWorkState::Started);
    }
}

#[test]
fn test_comments_are_stripped_before_buffering() {
    let mut batch = batch(&Arc::new(FakeDdlClient::succeeding()));
    batch
        .execute_ddl(&parse(
            "/* singers */ CREATE TABLE Singers (SingerId INT64) PRIMARY KEY (SingerId) -- done",
        ))
        .unwrap();
    assert_eq!(
        batch.statements(),
        &["CREATE TABLE Singers (SingerId INT64) PRIMARY KEY (SingerId)".to_string()]
    );
}

#[test]
fn test_non_ddl_statements_are_rejected() {
    let mut batch = batch(&Arc::new(FakeDdlClient::succeeding()));
    batch.execute_ddl(&parse(TABLES[0])).unwrap();

    for sql in [
        "SELECT * FROM Singers",
        "INSERT INTO Singers (SingerId) VALUES (1)",
        "RUN BATCH",
        "SHOW VARIABLE READONLY",
    ] {
        let err = batch.execute_ddl(&parse(sql)).unwrap_err();
        assert!(
            matches!(err, ConnectionError::NotDdlStatement(_)),
            "unexpected error for {}: {:?}",
            sql,
            err
        );
    }
    assert_eq!(batch.statements().len(), 1);
    assert_eq!(batch.state(), UnitOfWorkState::Started);
}

#[tokio::test]
async fn test_terminated_batches_reject_lifecycle_operations() {
    init_logging();

    for mut batch in terminated_batches().await {
        let state = batch.state();
        assert!(!batch.is_active());

        assert!(matches!(
            batch.execute_ddl(&parse(TABLES[1])),
            Err(ConnectionError::InvalidBatchState(_))
        ));
        assert!(matches!(
            batch.run_batch().await,
            Err(ConnectionError::InvalidBatchState(_))
        ));
        assert!(matches!(
            batch.abort_batch(),
            Err(ConnectionError::InvalidBatchState(_))
        ));
        assert_eq!(batch.state(), state, "state must not change after termination");
    }
}

#[tokio::test]
async fn test_data_operations_fail_in_every_state() {
    let mut batches = terminated_batches().await;
    batches.push(batch(&Arc::new(FakeDdlClient::succeeding())));

    for mut batch in batches {
        let update = parse("UPDATE Singers SET FirstName = 'Marc' WHERE SingerId = 1");
        let results = [
            batch.execute_update(&update).await.map(|_| ()),
            batch.execute_batch_update(&[update.clone()]).await.map(|_| ()),
            batch.write(Mutation::insert("Singers").set("SingerId", 1)).await,
            batch
                .write_all(vec![Mutation::replace("Singers").set("SingerId", 2)])
                .await,
            batch.commit().await,
            batch.rollback().await,
        ];
        for result in results {
            let err = result.unwrap_err();
            assert!(matches!(err, ConnectionError::OperationNotAllowed(_)));
            assert_eq!(err.code(), ErrorCode::FailedPrecondition);
        }
    }
}

#[tokio::test]
async fn test_plain_queries_are_not_allowed() {
    let batch = batch(&Arc::new(FakeDdlClient::succeeding()));
    let err = batch
        .execute_query(
            &parse("SELECT 1"),
            AnalyzeMode::None,
            &[QueryOption::PrefetchChunks(4)],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectionError::OperationNotAllowed(_)));
    assert_eq!(batch.state(), UnitOfWorkState::Started);
}

#[tokio::test]
async fn test_timestamps_in_every_state() {
    for batch in terminated_batches().await {
        assert!(matches!(
            batch.read_timestamp(),
            Err(ConnectionError::NoTimestampAvailable(_))
        ));
        assert!(matches!(
            batch.commit_timestamp(),
            Err(ConnectionError::NoTimestampAvailable(_))
        ));
        assert!(batch.read_timestamp_or_none().is_none());
        assert!(batch.commit_timestamp_or_none().is_none());
    }
}
