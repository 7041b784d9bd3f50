// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! DdlBatch command-line entry point

use clap::Parser;
use colored::Colorize;

use ddlbatch_cli::cli::{handle_classify, handle_run, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.level_filter())
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Commands::Run {
            script,
            timeout_ms,
            statement_delay_ms,
            config,
            format,
        } => handle_run(script, timeout_ms, statement_delay_ms, config, format).await,
        Commands::Classify { script, format } => handle_classify(script, format),
    };

    if let Err(e) = result {
        eprintln!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}
