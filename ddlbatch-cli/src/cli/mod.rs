// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for DdlBatch
//!
//! Provides command-line access to running DDL scripts as one batch against
//! the in-memory schema service, and to statement classification.

pub mod commands;
pub mod error;
pub mod handlers;
pub mod output;

pub use commands::{Cli, Commands, LogLevel, OutputFormat};
pub use error::CliError;
pub use handlers::{handle_classify, handle_run};
