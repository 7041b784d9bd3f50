// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! SQL statement classification
//!
//! This module provides:
//! - Comment stripping that respects quoted literals and identifiers
//! - Classification into DDL, query, update and client-side statements
//! - Splitting of multi-statement scripts

pub mod parser;

pub use parser::StatementParser;

use std::fmt;
use std::time::Duration;

/// Classification of a SQL statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementType {
    /// Schema change (CREATE, ALTER, DROP, ...)
    Ddl,
    /// Read-only query (SELECT, WITH)
    Query,
    /// Data modification (INSERT, UPDATE, DELETE)
    Update,
    /// Statement handled by the connection itself
    ClientSide,
    /// Anything the parser does not recognize
    Unknown,
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementType::Ddl => "DDL",
            StatementType::Query => "QUERY",
            StatementType::Update => "UPDATE",
            StatementType::ClientSide => "CLIENT_SIDE",
            StatementType::Unknown => "UNKNOWN",
        };
        write!(f, "{}", name)
    }
}

/// Statements interpreted by the connection instead of being sent to a service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSideStatement {
    StartBatchDdl,
    RunBatch,
    AbortBatch,
    /// `None` clears the timeout
    SetStatementTimeout(Option<Duration>),
}

/// A statement after comment stripping and classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStatement {
    sql: String,
    sql_without_comments: String,
    statement_type: StatementType,
    client_side: Option<ClientSideStatement>,
}

impl ParsedStatement {
    pub(crate) fn new(
        sql: String,
        sql_without_comments: String,
        statement_type: StatementType,
        client_side: Option<ClientSideStatement>,
    ) -> Self {
        Self {
            sql,
            sql_without_comments,
            statement_type,
            client_side,
        }
    }

    /// Build a client-side statement whose text needs no parsing
    pub(crate) fn client_side(sql: &str, statement: ClientSideStatement) -> Self {
        Self::new(
            sql.to_string(),
            sql.to_string(),
            StatementType::ClientSide,
            Some(statement),
        )
    }

    /// Statement text as supplied by the caller
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Statement text with comments and the trailing terminator removed
    pub fn sql_without_comments(&self) -> &str {
        &self.sql_without_comments
    }

    pub fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    pub fn client_side_statement(&self) -> Option<ClientSideStatement> {
        self.client_side
    }

    pub fn is_ddl(&self) -> bool {
        self.statement_type == StatementType::Ddl
    }

    pub fn is_query(&self) -> bool {
        self.statement_type == StatementType::Query
    }

    pub fn is_update(&self) -> bool {
        self.statement_type == StatementType::Update
    }
}
