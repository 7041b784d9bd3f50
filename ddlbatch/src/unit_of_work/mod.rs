// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Units of work
//!
//! A unit of work is a bounded sequence of statements sharing one lifecycle.
//! The connection holds at most one active unit of work and routes every
//! statement through it.
//!
//! This module provides:
//! - The [`UnitOfWork`] contract and its lifecycle states
//! - [`DdlBatch`], which buffers schema changes and applies them as one operation
//! - Update-count extraction from schema-change metadata

pub mod ddl_batch;
pub mod outcome;

pub use ddl_batch::{DdlBatch, DdlBatchBuilder};
pub use outcome::extract_update_counts;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::data::{AsyncResultSet, Mutation, QueryOption, ResultSet};
use crate::exec::Result;
use crate::statement::ParsedStatement;

/// Lifecycle state of a unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitOfWorkState {
    Started,
    Ran,
    RunFailed,
    Aborted,
}

impl UnitOfWorkState {
    /// Whether statements may still be added
    pub fn is_active(self) -> bool {
        self == UnitOfWorkState::Started
    }
}

impl fmt::Display for UnitOfWorkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitOfWorkState::Started => "STARTED",
            UnitOfWorkState::Ran => "RAN",
            UnitOfWorkState::RunFailed => "RUN_FAILED",
            UnitOfWorkState::Aborted => "ABORTED",
        };
        write!(f, "{}", name)
    }
}

/// Kind of unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkType {
    Transaction,
    Batch,
}

/// Query analysis requested together with a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyzeMode {
    /// Execute the query normally
    #[default]
    None,
    /// Return the query plan without executing
    Plan,
    /// Execute and return the plan with execution statistics
    Profile,
}

/// Statement sink with a lifecycle of its own
///
/// Mutating operations take `&mut self`: a unit of work has exactly one owner
/// at a time, which makes each state transition happen at most once.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn unit_type(&self) -> UnitOfWorkType;

    fn state(&self) -> UnitOfWorkState;

    fn is_active(&self) -> bool {
        self.state().is_active()
    }

    fn is_read_only(&self) -> bool;

    /// Execute a query and materialize its result
    async fn execute_query(
        &self,
        statement: &ParsedStatement,
        analyze_mode: AnalyzeMode,
        options: &[QueryOption],
    ) -> Result<ResultSet>;

    /// Start a query in the background
    fn execute_query_async(
        &self,
        statement: &ParsedStatement,
        analyze_mode: AnalyzeMode,
        options: &[QueryOption],
    ) -> Result<AsyncResultSet>;

    fn read_timestamp(&self) -> Result<DateTime<Utc>>;

    fn read_timestamp_or_none(&self) -> Option<DateTime<Utc>>;

    fn commit_timestamp(&self) -> Result<DateTime<Utc>>;

    fn commit_timestamp_or_none(&self) -> Option<DateTime<Utc>>;

    /// Add a schema-change statement
    fn execute_ddl(&mut self, ddl: &ParsedStatement) -> Result<()>;

    async fn execute_update(&mut self, update: &ParsedStatement) -> Result<i64>;

    async fn execute_batch_update(&mut self, updates: &[ParsedStatement]) -> Result<Vec<i64>>;

    async fn write(&mut self, mutation: Mutation) -> Result<()>;

    async fn write_all(&mut self, mutations: Vec<Mutation>) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;

    /// Send the buffered statements, returns one update count per statement
    async fn run_batch(&mut self) -> Result<Vec<i64>>;

    /// Discard the buffered statements
    fn abort_batch(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_started_is_active() {
        assert!(UnitOfWorkState::Started.is_active());
        assert!(!UnitOfWorkState::Ran.is_active());
        assert!(!UnitOfWorkState::RunFailed.is_active());
        assert!(!UnitOfWorkState::Aborted.is_active());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(UnitOfWorkState::RunFailed.to_string(), "RUN_FAILED");
        assert_eq!(AnalyzeMode::default(), AnalyzeMode::None);
    }
}
