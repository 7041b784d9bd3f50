// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the CLI

use ddlbatch::ConnectionError;
use thiserror::Error;

/// Errors reported by CLI commands
#[derive(Error, Debug)]
pub enum CliError {
    /// Script or config file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Script contains something the command cannot run
    #[error("Invalid script: {0}")]
    Script(String),

    /// The batch ran but not every statement was applied
    #[error("Batch failed: {0}")]
    BatchFailed(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Result type alias for CLI commands
pub type Result<T> = std::result::Result<T, CliError>;
