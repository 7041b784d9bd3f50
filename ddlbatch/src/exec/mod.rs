// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement execution infrastructure
//!
//! This module provides the error taxonomy shared by the connection layer,
//! the cause-chain walk used to classify collaborator failures, and the
//! cancellable execution frame every remote call runs in.

pub mod cause;
pub mod error;
pub mod statement_executor;

// Re-export the main types for convenience
pub use cause::{error_chain_message, extract_error_code, extract_service_cause};
pub use error::{BatchUpdateError, BoxError, ConnectionError, ErrorCode, Result, ServiceError};
pub use statement_executor::{ExecutionContext, StatementExecutor, DEFAULT_CANCEL_GRACE_PERIOD};
