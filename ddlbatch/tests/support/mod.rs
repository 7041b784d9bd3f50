// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Shared fakes for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

use ddlbatch::{
    BoxError, DdlBatch, DdlClient, DdlMetadata, DdlOperation, InMemoryDatabaseClient,
    ParsedStatement, ServiceError, StatementExecutor, StatementParser,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn parse(sql: &str) -> ParsedStatement {
    StatementParser::new()
        .parse(sql)
        .expect("Failed to parse statement")
}

/// How a fake operation ends
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Success,
    /// Fails with a service error wrapped in an operation error
    Failure(ServiceError),
    /// Fails with an error chain that holds no service error
    UntypedFailure(String),
    /// Never finishes
    Hang,
}

/// Error an operation reports, with the service error as its source
#[derive(Debug, Error)]
#[error("operation {name} failed")]
pub struct FakeOperationError {
    name: String,
    #[source]
    source: ServiceError,
}

/// Scripted schema-change service
pub struct FakeDdlClient {
    outcome: FakeOutcome,
    committed: Vec<usize>,
    submit_error: Option<ServiceError>,
    metadata_available: bool,
    metadata_statement_count: Option<usize>,
    submissions: Mutex<Vec<Vec<String>>>,
}

impl FakeDdlClient {
    fn new(outcome: FakeOutcome) -> Self {
        Self {
            outcome,
            committed: Vec::new(),
            submit_error: None,
            metadata_available: true,
            metadata_statement_count: None,
            submissions: Mutex::new(Vec::new()),
        }
    }

    pub fn succeeding() -> Self {
        Self::new(FakeOutcome::Success)
    }

    /// Fails after committing the statements at `committed`
    pub fn failing(error: ServiceError, committed: &[usize]) -> Self {
        Self::new(FakeOutcome::Failure(error)).with_committed(committed)
    }

    pub fn failing_untyped(message: &str, committed: &[usize]) -> Self {
        Self::new(FakeOutcome::UntypedFailure(message.to_string())).with_committed(committed)
    }

    /// Never finishes, after committing the statements at `committed`
    pub fn hanging(committed: &[usize]) -> Self {
        Self::new(FakeOutcome::Hang).with_committed(committed)
    }

    /// Refuses to start the operation at all
    pub fn rejecting(error: ServiceError) -> Self {
        let mut client = Self::new(FakeOutcome::Success);
        client.submit_error = Some(error);
        client
    }

    pub fn with_committed(mut self, committed: &[usize]) -> Self {
        self.committed = committed.to_vec();
        self
    }

    /// Report only the first `count` statements in the metadata
    pub fn with_metadata_statement_count(mut self, count: usize) -> Self {
        self.metadata_statement_count = Some(count);
        self
    }

    pub fn without_metadata(mut self) -> Self {
        self.metadata_available = false;
        self
    }

    pub fn submissions(&self) -> Vec<Vec<String>> {
        self.submissions.lock().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }

    fn metadata_for(&self, statements: &[String]) -> Option<DdlMetadata> {
        if !self.metadata_available {
            return None;
        }
        let count = self
            .metadata_statement_count
            .unwrap_or(statements.len())
            .min(statements.len());
        let mut metadata = DdlMetadata::new(statements[..count].to_vec());
        for index in &self.committed {
            metadata.record_commit(*index, Utc::now());
        }
        Some(metadata)
    }
}

#[async_trait]
impl DdlClient for FakeDdlClient {
    async fn execute_ddl(&self, statements: &[String]) -> Result<Box<dyn DdlOperation>, BoxError> {
        if let Some(error) = &self.submit_error {
            return Err(Box::new(error.clone()));
        }
        let number = {
            let mut submissions = self.submissions.lock();
            submissions.push(statements.to_vec());
            submissions.len()
        };

        Ok(Box::new(FakeOperation {
            name: format!("operations/fake-{}", number),
            outcome: self.outcome.clone(),
            metadata: self.metadata_for(statements),
        }))
    }
}

struct FakeOperation {
    name: String,
    outcome: FakeOutcome,
    metadata: Option<DdlMetadata>,
}

#[async_trait]
impl DdlOperation for FakeOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn wait(&self) -> Result<(), BoxError> {
        match &self.outcome {
            FakeOutcome::Success => Ok(()),
            FakeOutcome::Failure(error) => Err(Box::new(FakeOperationError {
                name: self.name.clone(),
                source: error.clone(),
            })),
            FakeOutcome::UntypedFailure(message) => {
                Err(Box::new(std::io::Error::other(message.clone())))
            }
            FakeOutcome::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    async fn metadata(&self) -> Result<DdlMetadata, BoxError> {
        self.metadata
            .clone()
            .ok_or_else(|| "metadata unavailable".into())
    }
}

pub fn batch(ddl_client: &Arc<FakeDdlClient>) -> DdlBatch {
    batch_with_executor(ddl_client, StatementExecutor::new())
}

pub fn batch_with_executor(ddl_client: &Arc<FakeDdlClient>, executor: StatementExecutor) -> DdlBatch {
    let ddl_client: Arc<dyn DdlClient> = ddl_client.clone();
    DdlBatch::builder()
        .ddl_client(ddl_client)
        .database_client(Arc::new(InMemoryDatabaseClient::new()))
        .statement_executor(executor)
        .build()
        .expect("Failed to build DDL batch")
}
