// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection layer
//!
//! A [`Connection`] parses statements and routes them: client-side statements
//! are handled locally, schema changes go to the active DDL batch (or run as a
//! batch of one), and queries go to the data client. Every remote call runs in
//! the connection's [`StatementExecutor`], so it honors the statement timeout
//! and can be cancelled from another task.

pub mod options;

pub use options::ConnectionOptions;

use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;

use crate::admin::DdlClient;
use crate::data::{DatabaseClient, QueryOption, ResultSet};
use crate::exec::{ConnectionError, Result, StatementExecutor};
use crate::statement::{ClientSideStatement, ParsedStatement, StatementParser, StatementType};
use crate::unit_of_work::{AnalyzeMode, DdlBatch, UnitOfWork, UnitOfWorkState};

/// Result of [`Connection::execute`]
#[derive(Debug, Clone, PartialEq)]
pub enum StatementResult {
    /// Statement completed without producing data
    NoResult,
    /// Rows returned by a query
    ResultSet(ResultSet),
    /// One update count per statement of a batch run
    UpdateCounts(Vec<i64>),
    /// Rows modified by an update
    UpdateCount(i64),
}

/// Session against one database
pub struct Connection {
    options: ConnectionOptions,
    parser: StatementParser,
    ddl_client: Arc<dyn DdlClient>,
    database_client: Arc<dyn DatabaseClient>,
    executor: StatementExecutor,
    unit_of_work: Option<Box<dyn UnitOfWork>>,
}

impl Connection {
    pub fn new(
        options: ConnectionOptions,
        ddl_client: Arc<dyn DdlClient>,
        database_client: Arc<dyn DatabaseClient>,
    ) -> Result<Self> {
        options.validate()?;
        let executor = StatementExecutor::with_timeouts(
            options.statement_timeout(),
            options.cancel_grace_period(),
        );
        info!("Opened connection to database '{}'", options.database);

        Ok(Self {
            options,
            parser: StatementParser::new(),
            ddl_client,
            database_client,
            executor,
            unit_of_work: None,
        })
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    pub fn is_ddl_batch_active(&self) -> bool {
        self.unit_of_work
            .as_ref()
            .is_some_and(|unit| unit.is_active())
    }

    /// State of the current unit of work, if there is one
    pub fn unit_of_work_state(&self) -> Option<UnitOfWorkState> {
        self.unit_of_work.as_ref().map(|unit| unit.state())
    }

    /// Parse and execute one statement
    pub async fn execute(&mut self, sql: &str) -> Result<StatementResult> {
        let statement = self.parser.parse(sql)?;
        debug!(
            "Executing {} statement: {}",
            statement.statement_type(),
            statement.sql_without_comments()
        );

        match statement.statement_type() {
            StatementType::ClientSide => self.execute_client_side(&statement).await,
            StatementType::Ddl => {
                self.execute_ddl(&statement).await?;
                Ok(StatementResult::NoResult)
            }
            StatementType::Query => {
                let result = self.execute_parsed_query(&statement, Vec::new()).await?;
                Ok(StatementResult::ResultSet(result))
            }
            StatementType::Update => match self.unit_of_work.as_mut() {
                Some(unit) => unit
                    .execute_update(&statement)
                    .await
                    .map(StatementResult::UpdateCount),
                None => Err(ConnectionError::Unsupported(format!(
                    "Updates require a read/write transaction: {}",
                    statement.sql_without_comments()
                ))),
            },
            StatementType::Unknown => Err(ConnectionError::InvalidArgument(format!(
                "Unknown statement: {}",
                statement.sql_without_comments()
            ))),
        }
    }

    async fn execute_client_side(&mut self, statement: &ParsedStatement) -> Result<StatementResult> {
        match statement.client_side_statement() {
            Some(ClientSideStatement::StartBatchDdl) => {
                self.start_batch_ddl()?;
                Ok(StatementResult::NoResult)
            }
            Some(ClientSideStatement::RunBatch) => {
                self.run_batch().await.map(StatementResult::UpdateCounts)
            }
            Some(ClientSideStatement::AbortBatch) => {
                self.abort_batch()?;
                Ok(StatementResult::NoResult)
            }
            Some(ClientSideStatement::SetStatementTimeout(timeout)) => {
                self.set_statement_timeout(timeout);
                Ok(StatementResult::NoResult)
            }
            None => Err(ConnectionError::InvalidArgument(format!(
                "Not a client-side statement: {}",
                statement.sql_without_comments()
            ))),
        }
    }

    fn new_ddl_batch(&self) -> Result<DdlBatch> {
        DdlBatch::builder()
            .ddl_client(Arc::clone(&self.ddl_client))
            .database_client(Arc::clone(&self.database_client))
            .statement_executor(self.executor.clone())
            .build()
    }

    async fn execute_ddl(&mut self, statement: &ParsedStatement) -> Result<()> {
        if let Some(unit) = self.unit_of_work.as_mut() {
            return unit.execute_ddl(statement);
        }

        let mut batch = self.new_ddl_batch()?;
        batch.execute_ddl(statement)?;
        batch.run_batch().await.map(|_| ())
    }

    async fn execute_parsed_query(
        &self,
        statement: &ParsedStatement,
        options: Vec<QueryOption>,
    ) -> Result<ResultSet> {
        if let Some(unit) = self.unit_of_work.as_ref() {
            return unit
                .execute_query(statement, AnalyzeMode::None, &options)
                .await;
        }

        let options: Vec<QueryOption> = options
            .into_iter()
            .filter(|option| !option.is_internal_metadata_query())
            .collect();
        let client = Arc::clone(&self.database_client);
        let sql = statement.sql_without_comments().to_string();
        self.executor
            .execute(statement, move |_ctx| async move {
                client.single_use_query(&sql, &options).await
            })
            .await
    }

    /// Run a query with user-supplied options
    pub async fn execute_query(&self, sql: &str, options: &[QueryOption]) -> Result<ResultSet> {
        let statement = self.parse_query(sql)?;
        self.execute_parsed_query(&statement, options.to_vec()).await
    }

    /// Run a query that inspects database metadata
    ///
    /// Such queries are allowed while a DDL batch is active, e.g. to check
    /// whether a table or index exists.
    pub async fn execute_metadata_query(&self, sql: &str) -> Result<ResultSet> {
        let statement = self.parse_query(sql)?;
        self.execute_parsed_query(&statement, vec![QueryOption::internal_metadata_query()])
            .await
    }

    fn parse_query(&self, sql: &str) -> Result<ParsedStatement> {
        let statement = self.parser.parse(sql)?;
        if !statement.is_query() {
            return Err(ConnectionError::InvalidArgument(format!(
                "Statement is not a query: {}",
                statement.sql_without_comments()
            )));
        }
        Ok(statement)
    }

    /// Start buffering DDL statements
    pub fn start_batch_ddl(&mut self) -> Result<()> {
        if self.unit_of_work.is_some() {
            return Err(ConnectionError::InvalidBatchState(
                "Cannot start a DDL batch when a batch is already active".to_string(),
            ));
        }
        self.unit_of_work = Some(Box::new(self.new_ddl_batch()?));
        debug!("Started DDL batch");
        Ok(())
    }

    /// Run the active batch and release it, whatever the outcome
    pub async fn run_batch(&mut self) -> Result<Vec<i64>> {
        let mut unit = self.take_batch("run")?;
        unit.run_batch().await
    }

    /// Abort the active batch and release it
    pub fn abort_batch(&mut self) -> Result<()> {
        let mut unit = self.take_batch("abort")?;
        unit.abort_batch()
    }

    fn take_batch(&mut self, action: &str) -> Result<Box<dyn UnitOfWork>> {
        self.unit_of_work.take().ok_or_else(|| {
            ConnectionError::InvalidBatchState(format!(
                "This connection has no active batch to {}",
                action
            ))
        })
    }

    /// Cancel the statements that are currently running
    pub fn cancel(&self) -> bool {
        self.executor.cancel()
    }

    /// Handle that can cancel statements of this connection from another task
    pub fn cancel_handle(&self) -> StatementExecutor {
        self.executor.clone()
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.executor.statement_timeout()
    }

    pub fn set_statement_timeout(&self, timeout: Option<Duration>) {
        debug!("Statement timeout set to {:?}", timeout);
        self.executor.set_statement_timeout(timeout);
    }
}
