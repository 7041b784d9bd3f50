// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! DdlBatch - DDL batching for database connections
//!
//! This crate provides the connection-layer unit of work that buffers schema
//! changes and submits them to the schema-change service as one long-running
//! operation. Schema changes are applied one at a time by the service, so a
//! failed batch reports per-statement update counts telling the caller which
//! statements were committed.
//!
//! # Quick Start
//!
//! ```text
//! let mut connection = Connection::new(options, ddl_client, database_client)?;
//!
//! connection.execute("START BATCH DDL").await?;
//! connection.execute("CREATE TABLE Singers (Id INT64) PRIMARY KEY (Id)").await?;
//! connection.execute("CREATE INDEX SingersById ON Singers (Id)").await?;
//!
//! match connection.run_batch().await {
//!     Ok(update_counts) => println!("Applied: {:?}", update_counts),
//!     Err(e) => println!("Failed ({:?} applied): {}", e.update_counts(), e),
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Connection (routing, client-side       │
//! │  statements, statement timeout)         │
//! └─────────────────────────────────────────┘
//!                  │
//!                  ▼
//! ┌─────────────────────────────────────────┐
//! │  DdlBatch (state machine, guards,       │
//! │  update-count extraction)               │
//! └─────────────────────────────────────────┘
//!          │                      │
//!          ▼                      ▼
//! ┌──────────────────┐  ┌──────────────────┐
//! │  DdlClient       │  │  DatabaseClient  │
//! │  (schema changes)│  │  (metadata reads)│
//! └──────────────────┘  └──────────────────┘
//! ```
//!
//! # Module Organization
//!
//! - [`connection`] - Connection and its configuration
//! - [`unit_of_work`] - Units of work and the DDL batch
//! - [`statement`] - Statement parsing and classification
//! - [`admin`] - Schema-change service contracts and in-memory service
//! - [`data`] - Data client contracts, results and mutations
//! - [`exec`] - Errors, cause-chain inspection and the execution frame

pub mod admin;
pub mod connection;
pub mod data;
pub mod exec;
pub mod statement;
pub mod unit_of_work;

// Re-export the main types for convenience
pub use admin::{DdlClient, DdlMetadata, DdlOperation, InMemoryDdlClient};
pub use connection::{Connection, ConnectionOptions, StatementResult};
pub use data::{DatabaseClient, InMemoryDatabaseClient, Mutation, QueryOption, ResultSet, Value};
pub use exec::{
    BatchUpdateError, BoxError, ConnectionError, ErrorCode, Result, ServiceError,
    StatementExecutor,
};
pub use statement::{ParsedStatement, StatementParser, StatementType};
pub use unit_of_work::{
    extract_update_counts, AnalyzeMode, DdlBatch, UnitOfWork, UnitOfWorkState, UnitOfWorkType,
};
