// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Schema-change service contracts
//!
//! A [`DdlClient`] accepts an ordered list of DDL statements and returns a
//! handle to the long-running operation that applies them. The service applies
//! the statements one at a time, so the operation's [`DdlMetadata`] is the only
//! record of which statements were committed when the operation fails.

pub mod memory;

pub use memory::{InMemoryDdlClient, OperationFailed, SchemaObject, SchemaObjectKind};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::exec::BoxError;

/// Progress of a schema-change operation
///
/// `commit_timestamps[i]` is set once statement `i` has been applied. The
/// vector may be shorter than `statements` and may contain gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdlMetadata {
    pub statements: Vec<String>,
    pub commit_timestamps: Vec<Option<DateTime<Utc>>>,
}

impl DdlMetadata {
    pub fn new(statements: Vec<String>) -> Self {
        Self {
            statements,
            commit_timestamps: Vec::new(),
        }
    }

    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }

    /// Commit marker of statement `index`, if one was recorded
    pub fn commit_timestamp(&self, index: usize) -> Option<DateTime<Utc>> {
        self.commit_timestamps.get(index).copied().flatten()
    }

    /// Record that statement `index` was applied at `timestamp`
    pub fn record_commit(&mut self, index: usize, timestamp: DateTime<Utc>) {
        if self.commit_timestamps.len() <= index {
            self.commit_timestamps.resize(index + 1, None);
        }
        self.commit_timestamps[index] = Some(timestamp);
    }
}

/// Handle to a long-running schema-change operation
#[async_trait]
pub trait DdlOperation: Send + Sync {
    /// Service-assigned operation name
    fn name(&self) -> &str;

    /// Wait until the operation has finished
    async fn wait(&self) -> Result<(), BoxError>;

    /// Best-effort snapshot of the operation's metadata
    ///
    /// Available while the operation is running and after it failed.
    async fn metadata(&self) -> Result<DdlMetadata, BoxError>;
}

/// Client of the schema-change service
#[async_trait]
pub trait DdlClient: Send + Sync {
    /// Submit `statements` as one operation, to be applied in order
    async fn execute_ddl(&self, statements: &[String]) -> Result<Box<dyn DdlOperation>, BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_commit_fills_gaps() {
        let mut metadata = DdlMetadata::new(vec!["A".into(), "B".into(), "C".into()]);
        let now = Utc::now();
        metadata.record_commit(2, now);

        assert_eq!(metadata.statement_count(), 3);
        assert_eq!(metadata.commit_timestamps.len(), 3);
        assert_eq!(metadata.commit_timestamp(0), None);
        assert_eq!(metadata.commit_timestamp(2), Some(now));
        assert_eq!(metadata.commit_timestamp(7), None);
    }
}
