// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! DDL batch unit of work
//!
//! A [`DdlBatch`] only accepts schema-change statements. They are buffered
//! locally and sent to the schema-change service as one operation when the
//! batch is run. Running a batch is not atomic: when the operation fails, a
//! possibly empty subset of the statements has been applied, and the update
//! counts of the returned [`BatchUpdateError`] report which ones.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use std::sync::Arc;

use super::outcome::extract_update_counts;
use super::{AnalyzeMode, UnitOfWork, UnitOfWorkState, UnitOfWorkType};
use crate::admin::{DdlClient, DdlOperation};
use crate::data::{AsyncResultSet, DatabaseClient, Mutation, QueryOption, ResultSet};
use crate::exec::{
    error_chain_message, extract_error_code, BatchUpdateError, ConnectionError, ErrorCode,
    ExecutionContext, Result, StatementExecutor,
};
use crate::statement::{ClientSideStatement, ParsedStatement};

/// Statement the batch run executes under, so it can time out and be cancelled
static RUN_BATCH: Lazy<ParsedStatement> =
    Lazy::new(|| ParsedStatement::client_side("RUN BATCH", ClientSideStatement::RunBatch));

/// Builder for [`DdlBatch`]
#[derive(Default)]
pub struct DdlBatchBuilder {
    ddl_client: Option<Arc<dyn DdlClient>>,
    database_client: Option<Arc<dyn DatabaseClient>>,
    executor: Option<StatementExecutor>,
}

impl DdlBatchBuilder {
    pub fn ddl_client(mut self, client: Arc<dyn DdlClient>) -> Self {
        self.ddl_client = Some(client);
        self
    }

    pub fn database_client(mut self, client: Arc<dyn DatabaseClient>) -> Self {
        self.database_client = Some(client);
        self
    }

    /// Execution frame to run in; a fresh frame without timeout by default
    pub fn statement_executor(mut self, executor: StatementExecutor) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn build(self) -> Result<DdlBatch> {
        let ddl_client = self
            .ddl_client
            .ok_or_else(|| ConnectionError::Configuration("No DdlClient specified".to_string()))?;
        let database_client = self.database_client.ok_or_else(|| {
            ConnectionError::Configuration("No DatabaseClient specified".to_string())
        })?;

        Ok(DdlBatch {
            ddl_client,
            database_client,
            executor: self.executor.unwrap_or_default(),
            statements: Vec::new(),
            state: UnitOfWorkState::Started,
        })
    }
}

/// Unit of work that buffers DDL statements until the batch is run
pub struct DdlBatch {
    ddl_client: Arc<dyn DdlClient>,
    database_client: Arc<dyn DatabaseClient>,
    executor: StatementExecutor,
    statements: Vec<String>,
    state: UnitOfWorkState,
}

impl DdlBatch {
    pub fn builder() -> DdlBatchBuilder {
        DdlBatchBuilder::default()
    }

    /// Buffered statements, comments stripped, in the order they were added
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    fn not_allowed<T>(message: &str) -> Result<T> {
        Err(ConnectionError::OperationNotAllowed(message.to_string()))
    }
}

/// Options to forward for a query executed while a DDL batch is active
///
/// Only queries tagged as internal metadata probes are let through, and the
/// tag itself is not forwarded.
fn verify_query_for_ddl_batch(
    statement: &ParsedStatement,
    analyze_mode: AnalyzeMode,
    options: &[QueryOption],
) -> Result<Vec<QueryOption>> {
    if !options.iter().any(QueryOption::is_internal_metadata_query) {
        return DdlBatch::not_allowed("Executing queries is not allowed for DDL batches.");
    }
    if !statement.is_query() {
        return Err(ConnectionError::InvalidArgument(format!(
            "Statement is not a query: {}",
            statement.sql_without_comments()
        )));
    }
    if analyze_mode != AnalyzeMode::None {
        return DdlBatch::not_allowed("Analyze is not allowed for DDL batches.");
    }

    Ok(options
        .iter()
        .filter(|option| !option.is_internal_metadata_query())
        .cloned()
        .collect())
}

/// Submit `statements` and wait for the operation under `ctx`
async fn run_statements(
    ddl_client: &dyn DdlClient,
    statements: &[String],
    ctx: ExecutionContext,
) -> Result<()> {
    let operation = ddl_client.execute_ddl(statements).await.map_err(|e| {
        BatchUpdateError::new(
            extract_error_code(&*e),
            error_chain_message(&*e),
            vec![0; statements.len()],
        )
    })?;
    debug!("Waiting for schema-change operation {}", operation.name());

    let finished = tokio::select! {
        biased;
        outcome = operation.wait() => Some(outcome),
        _ = ctx.cancelled() => None,
    };

    let (code, message) = match finished {
        Some(Ok(())) => {
            match operation.metadata().await {
                Ok(metadata) => debug!(
                    "Operation {} applied {} statement(s)",
                    operation.name(),
                    metadata.statement_count()
                ),
                Err(e) => warn!(
                    "Could not read metadata of completed operation {}: {}",
                    operation.name(),
                    e
                ),
            }
            return Ok(());
        }
        Some(Err(e)) => (extract_error_code(&*e), error_chain_message(&*e)),
        None => (
            ErrorCode::Cancelled,
            format!("Schema-change operation {} was cancelled", operation.name()),
        ),
    };

    let update_counts = applied_statements(operation.as_ref(), statements.len()).await;
    Err(BatchUpdateError::new(code, message, update_counts).into())
}

/// Update counts known for an unfinished or failed operation
async fn applied_statements(operation: &dyn DdlOperation, statement_count: usize) -> Vec<i64> {
    let mut update_counts = match operation.metadata().await {
        Ok(metadata) => extract_update_counts(&metadata),
        Err(e) => {
            warn!(
                "Could not read metadata of operation {}: {}",
                operation.name(),
                e
            );
            Vec::new()
        }
    };
    update_counts.resize(statement_count, 0);
    update_counts
}

#[async_trait]
impl UnitOfWork for DdlBatch {
    fn unit_type(&self) -> UnitOfWorkType {
        UnitOfWorkType::Batch
    }

    fn state(&self) -> UnitOfWorkState {
        self.state
    }

    fn is_read_only(&self) -> bool {
        false
    }

    async fn execute_query(
        &self,
        statement: &ParsedStatement,
        analyze_mode: AnalyzeMode,
        options: &[QueryOption],
    ) -> Result<ResultSet> {
        let options = verify_query_for_ddl_batch(statement, analyze_mode, options)?;
        let client = Arc::clone(&self.database_client);
        let sql = statement.sql_without_comments().to_string();
        debug!("Executing metadata query during DDL batch: {}", sql);

        self.executor
            .execute(statement, move |_ctx| async move {
                client.single_use_query(&sql, &options).await
            })
            .await
    }

    fn execute_query_async(
        &self,
        statement: &ParsedStatement,
        analyze_mode: AnalyzeMode,
        options: &[QueryOption],
    ) -> Result<AsyncResultSet> {
        let options = verify_query_for_ddl_batch(statement, analyze_mode, options)?;
        let client = Arc::clone(&self.database_client);
        let sql = statement.sql_without_comments().to_string();

        AsyncResultSet::spawn(async move { client.single_use_query(&sql, &options).await })
    }

    fn read_timestamp(&self) -> Result<DateTime<Utc>> {
        Err(ConnectionError::NoTimestampAvailable(
            "There is no read timestamp available for DDL batches.".to_string(),
        ))
    }

    fn read_timestamp_or_none(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn commit_timestamp(&self) -> Result<DateTime<Utc>> {
        Err(ConnectionError::NoTimestampAvailable(
            "There is no commit timestamp available for DDL batches.".to_string(),
        ))
    }

    fn commit_timestamp_or_none(&self) -> Option<DateTime<Utc>> {
        None
    }

    fn execute_ddl(&mut self, ddl: &ParsedStatement) -> Result<()> {
        if self.state != UnitOfWorkState::Started {
            return Err(ConnectionError::InvalidBatchState(
                "The batch is no longer active and cannot be used for further statements"
                    .to_string(),
            ));
        }
        if !ddl.is_ddl() {
            return Err(ConnectionError::NotDdlStatement(format!(
                "Only DDL statements are allowed. \"{}\" is not a DDL-statement.",
                ddl.sql_without_comments()
            )));
        }

        debug!("Buffering DDL statement: {}", ddl.sql_without_comments());
        self.statements.push(ddl.sql_without_comments().to_string());
        Ok(())
    }

    async fn execute_update(&mut self, _update: &ParsedStatement) -> Result<i64> {
        Self::not_allowed("Executing updates is not allowed for DDL batches.")
    }

    async fn execute_batch_update(&mut self, _updates: &[ParsedStatement]) -> Result<Vec<i64>> {
        Self::not_allowed("Executing batch updates is not allowed for DDL batches.")
    }

    async fn write(&mut self, _mutation: Mutation) -> Result<()> {
        Self::not_allowed("Writing mutations is not allowed for DDL batches.")
    }

    async fn write_all(&mut self, _mutations: Vec<Mutation>) -> Result<()> {
        Self::not_allowed("Writing mutations is not allowed for DDL batches.")
    }

    async fn commit(&mut self) -> Result<()> {
        Self::not_allowed("Commit is not allowed for DDL batches.")
    }

    async fn rollback(&mut self) -> Result<()> {
        Self::not_allowed("Rollback is not allowed for DDL batches.")
    }

    async fn run_batch(&mut self) -> Result<Vec<i64>> {
        if self.state != UnitOfWorkState::Started {
            return Err(ConnectionError::InvalidBatchState(
                "The batch is no longer active and cannot be ran".to_string(),
            ));
        }
        if self.statements.is_empty() {
            debug!("Running empty DDL batch");
            self.state = UnitOfWorkState::Ran;
            return Ok(Vec::new());
        }

        info!("Running DDL batch with {} statement(s)", self.statements.len());
        let ddl_client = Arc::clone(&self.ddl_client);
        let statements = &self.statements;
        let result = self
            .executor
            .execute(&RUN_BATCH, |ctx| async move {
                run_statements(ddl_client.as_ref(), statements, ctx).await
            })
            .await;

        match result {
            Ok(()) => {
                self.state = UnitOfWorkState::Ran;
                info!("DDL batch applied {} statement(s)", self.statements.len());
                Ok(vec![1; self.statements.len()])
            }
            Err(e) => {
                self.state = UnitOfWorkState::RunFailed;
                warn!("DDL batch failed: {}", e);
                Err(e)
            }
        }
    }

    fn abort_batch(&mut self) -> Result<()> {
        if self.state != UnitOfWorkState::Started {
            return Err(ConnectionError::InvalidBatchState(
                "The batch is no longer active and cannot be aborted.".to_string(),
            ));
        }
        debug!("Aborting DDL batch with {} statement(s)", self.statements.len());
        self.state = UnitOfWorkState::Aborted;
        Ok(())
    }
}
