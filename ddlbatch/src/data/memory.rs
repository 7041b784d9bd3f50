// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Canned-result database client

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::{DatabaseClient, QueryOption, ResultSet};
use crate::exec::{ConnectionError, ErrorCode, Result};

/// Query received by an [`InMemoryDatabaseClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub options: Vec<QueryOption>,
}

/// Database client that answers queries from registered results
///
/// Every query is recorded together with the options it was sent with.
#[derive(Clone, Default)]
pub struct InMemoryDatabaseClient {
    results: Arc<Mutex<HashMap<String, ResultSet>>>,
    queries: Arc<Mutex<Vec<RecordedQuery>>>,
}

impl InMemoryDatabaseClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with `result` from now on
    pub fn register_result(&self, sql: impl Into<String>, result: ResultSet) {
        self.results.lock().insert(sql.into().trim().to_string(), result);
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl DatabaseClient for InMemoryDatabaseClient {
    async fn single_use_query(&self, sql: &str, options: &[QueryOption]) -> Result<ResultSet> {
        debug!("Single-use query: {}", sql);
        self.queries.lock().push(RecordedQuery {
            sql: sql.to_string(),
            options: options.to_vec(),
        });

        self.results
            .lock()
            .get(sql.trim())
            .cloned()
            .ok_or_else(|| {
                ConnectionError::service(
                    ErrorCode::NotFound,
                    format!("No result registered for query: {}", sql),
                )
            })
    }
}
