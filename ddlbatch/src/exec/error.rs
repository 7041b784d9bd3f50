// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the connection layer
//!
//! Guard violations are raised synchronously as typed variants of
//! [`ConnectionError`]. Failures reported by the schema-change service or the
//! data client are carried as [`ServiceError`], and a failed batch run is
//! reported as a [`BatchUpdateError`] carrying the per-statement update counts
//! known at the time of failure.

use std::fmt;
use thiserror::Error;

/// Boxed error used to transport collaborator failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for connection-layer operations
pub type Result<T> = std::result::Result<T, ConnectionError>;

/// Canonical status codes reported by the database services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl ErrorCode {
    /// Upper snake case name, as printed by the services
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Cancelled => "CANCELLED",
            ErrorCode::Unknown => "UNKNOWN",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            ErrorCode::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorCode::Aborted => "ABORTED",
            ErrorCode::OutOfRange => "OUT_OF_RANGE",
            ErrorCode::Unimplemented => "UNIMPLEMENTED",
            ErrorCode::Internal => "INTERNAL",
            ErrorCode::Unavailable => "UNAVAILABLE",
            ErrorCode::DataLoss => "DATA_LOSS",
            ErrorCode::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reported by a database service
///
/// This is the typed error the cause-chain walk looks for when classifying
/// why a schema-change operation failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ServiceError {
    pub code: ErrorCode,
    pub message: String,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Failure of a batch run
///
/// `update_counts` has one entry per buffered statement: `1` when the service
/// confirmed the statement was applied, `0` otherwise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct BatchUpdateError {
    pub code: ErrorCode,
    pub message: String,
    pub update_counts: Vec<i64>,
}

impl BatchUpdateError {
    pub fn new(code: ErrorCode, message: impl Into<String>, update_counts: Vec<i64>) -> Self {
        Self {
            code,
            message: message.into(),
            update_counts,
        }
    }

    /// Whether the run was cancelled while the operation was outstanding
    pub fn is_cancelled(&self) -> bool {
        self.code == ErrorCode::Cancelled
    }

    /// Number of statements the service confirmed as applied
    pub fn applied_count(&self) -> usize {
        self.update_counts.iter().filter(|count| **count > 0).count()
    }
}

/// Main error type for connection-layer operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    /// Operation attempted outside the state in which it is legal
    #[error("Invalid batch state: {0}")]
    InvalidBatchState(String),

    /// A statement that is not a schema change was handed to a DDL batch
    #[error("Not a DDL statement: {0}")]
    NotDdlStatement(String),

    /// Operation that a DDL batch never accepts
    #[error("Operation not allowed: {0}")]
    OperationNotAllowed(String),

    /// Timestamp accessor called where no timestamp applies
    #[error("No timestamp available: {0}")]
    NoTimestampAvailable(String),

    /// A batch run failed, possibly after applying a prefix of its statements
    #[error("Batch update failed: {0}")]
    BatchUpdate(#[from] BatchUpdateError),

    /// Error returned by a database service
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// Invalid argument supplied by the caller
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Statement kind this connection cannot execute
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl ConnectionError {
    /// Status code the error would carry on the wire
    pub fn code(&self) -> ErrorCode {
        match self {
            ConnectionError::InvalidBatchState(_)
            | ConnectionError::OperationNotAllowed(_)
            | ConnectionError::NoTimestampAvailable(_) => ErrorCode::FailedPrecondition,
            ConnectionError::NotDdlStatement(_)
            | ConnectionError::InvalidArgument(_)
            | ConnectionError::Configuration(_) => ErrorCode::InvalidArgument,
            ConnectionError::BatchUpdate(e) => e.code,
            ConnectionError::Service(e) => e.code,
            ConnectionError::Unsupported(_) => ErrorCode::Unimplemented,
        }
    }

    /// Update counts of a failed batch run, if this is one
    pub fn update_counts(&self) -> Option<&[i64]> {
        match self {
            ConnectionError::BatchUpdate(e) => Some(&e.update_counts),
            _ => None,
        }
    }

    pub(crate) fn service(code: ErrorCode, message: impl Into<String>) -> Self {
        ConnectionError::Service(ServiceError::new(code, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_errors_map_to_failed_precondition() {
        let errors = [
            ConnectionError::InvalidBatchState("done".to_string()),
            ConnectionError::OperationNotAllowed("no".to_string()),
            ConnectionError::NoTimestampAvailable("none".to_string()),
        ];
        for error in errors {
            assert_eq!(error.code(), ErrorCode::FailedPrecondition);
        }
        assert_eq!(
            ConnectionError::NotDdlStatement("SELECT 1".to_string()).code(),
            ErrorCode::InvalidArgument
        );
    }

    #[test]
    fn test_batch_update_error_carries_counts() {
        let error: ConnectionError =
            BatchUpdateError::new(ErrorCode::AlreadyExists, "exists", vec![1, 1, 0]).into();
        assert_eq!(error.code(), ErrorCode::AlreadyExists);
        assert_eq!(error.update_counts(), Some(&[1, 1, 0][..]));
        assert!(error.to_string().contains("ALREADY_EXISTS"));
    }

    #[test]
    fn test_cancelled_specialization() {
        let cancelled = BatchUpdateError::new(ErrorCode::Cancelled, "cancelled", vec![1, 0]);
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.applied_count(), 1);

        let failed = BatchUpdateError::new(ErrorCode::Unknown, "boom", vec![0, 0]);
        assert!(!failed.is_cancelled());
        assert_eq!(failed.applied_count(), 0);
    }
}
