// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::exec::{ConnectionError, Result, DEFAULT_CANCEL_GRACE_PERIOD};

/// Options a [`Connection`](super::Connection) is opened with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Database the connection talks to
    pub database: String,
    /// Timeout for each statement, no timeout when absent
    pub statement_timeout_ms: Option<u64>,
    /// Time an interrupted statement gets to report partial results
    pub cancel_grace_period_ms: u64,
}

/// Whole milliseconds of `duration`, saturating at `u64::MAX`
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            database: "default".to_string(),
            statement_timeout_ms: None,
            cancel_grace_period_ms: millis(DEFAULT_CANCEL_GRACE_PERIOD),
        }
    }
}

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout_ms = Some(millis(timeout));
        self
    }

    pub fn with_cancel_grace_period(mut self, grace_period: Duration) -> Self {
        self.cancel_grace_period_ms = millis(grace_period);
        self
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_ms.map(Duration::from_millis)
    }

    pub fn cancel_grace_period(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_period_ms)
    }

    /// Parse and validate options from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)
            .map_err(|e| ConnectionError::Configuration(format!("Invalid options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Parse and validate options from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            ConnectionError::Configuration(format!(
                "Failed to read options file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(ConnectionError::Configuration(
                "Database name must not be empty".to_string(),
            ));
        }
        if self.statement_timeout_ms == Some(0) {
            return Err(ConnectionError::Configuration(
                "Statement timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
