// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Data-operations contracts
//!
//! This module provides:
//! - The [`DatabaseClient`] used for single-use reads
//! - Query options, including the internal metadata-probe tag
//! - Materialized result sets and their values
//! - Mutations, which DDL batches reject

pub mod memory;

pub use memory::{InMemoryDatabaseClient, RecordedQuery};

use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use tokio::task::JoinHandle;

use crate::exec::{ConnectionError, ErrorCode, Result};

/// Marker carried by queries the library issues on its own behalf
///
/// Only this crate can construct it, so end users cannot tag their queries as
/// metadata probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InternalMetadataQuery {
    _private: (),
}

/// Options forwarded with a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOption {
    /// Number of partial result chunks to buffer while streaming
    PrefetchChunks(u32),
    /// Tag attached to the request for service-side statistics
    RequestTag(String),
    /// Query issued internally to inspect database metadata
    InternalMetadataQuery(InternalMetadataQuery),
}

impl QueryOption {
    pub(crate) fn internal_metadata_query() -> Self {
        QueryOption::InternalMetadataQuery(InternalMetadataQuery { _private: () })
    }

    pub fn is_internal_metadata_query(&self) -> bool {
        matches!(self, QueryOption::InternalMetadataQuery(_))
    }
}

/// Column value in a result set or mutation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// Fully materialized query result
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row; it must have one value per column
    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value of `column` in row `row`
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self
            .columns
            .iter()
            .position(|name| name.eq_ignore_ascii_case(column))?;
        self.rows.get(row)?.get(index)
    }
}

/// Query result that is being produced on a background task
pub struct AsyncResultSet {
    handle: JoinHandle<Result<ResultSet>>,
}

impl AsyncResultSet {
    /// Start `query` on the current Tokio runtime
    pub(crate) fn spawn<F>(query: F) -> Result<Self>
    where
        F: Future<Output = Result<ResultSet>> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            ConnectionError::Configuration(
                "Asynchronous queries must be started from within a Tokio runtime".to_string(),
            )
        })?;
        Ok(Self {
            handle: runtime.spawn(query),
        })
    }

    /// Wait for the query to finish
    pub async fn result(self) -> Result<ResultSet> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ConnectionError::service(
                ErrorCode::Cancelled,
                "Asynchronous query was cancelled",
            )),
            Err(e) => Err(ConnectionError::service(
                ErrorCode::Internal,
                format!("Asynchronous query failed: {}", e),
            )),
        }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// Client for data reads
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Run `sql` in a single-use read-only transaction against current data
    async fn single_use_query(&self, sql: &str, options: &[QueryOption]) -> Result<ResultSet>;
}

/// Kind of write a [`Mutation`] performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    Insert,
    Update,
    InsertOrUpdate,
    Replace,
    Delete,
}

/// Row-level write to a table
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    op: MutationOp,
    table: String,
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Mutation {
    fn new(op: MutationOp, table: impl Into<String>) -> Self {
        Self {
            op,
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn insert(table: impl Into<String>) -> Self {
        Self::new(MutationOp::Insert, table)
    }

    pub fn update(table: impl Into<String>) -> Self {
        Self::new(MutationOp::Update, table)
    }

    pub fn insert_or_update(table: impl Into<String>) -> Self {
        Self::new(MutationOp::InsertOrUpdate, table)
    }

    pub fn replace(table: impl Into<String>) -> Self {
        Self::new(MutationOp::Replace, table)
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(MutationOp::Delete, table)
    }

    /// Set `column` to `value`
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.push(column.into());
        self.values.push(value.into());
        self
    }

    pub fn op(&self) -> MutationOp {
        self.op
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}
