// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command handlers for DdlBatch

use colored::Colorize;
use log::{debug, info};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ddlbatch::admin::SchemaObject;
use ddlbatch::statement::ClientSideStatement;
use ddlbatch::{
    Connection, ConnectionError, ConnectionOptions, InMemoryDatabaseClient, InMemoryDdlClient,
    StatementParser,
};

use super::commands::OutputFormat;
use super::error::{CliError, Result};
use super::output::OutcomeFormatter;

/// Update count of one statement of a batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementOutcome {
    pub statement: String,
    pub update_count: i64,
}

impl StatementOutcome {
    pub fn applied(&self) -> bool {
        self.update_count > 0
    }
}

/// What a batch run did to the schema
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub database: String,
    pub outcomes: Vec<StatementOutcome>,
    /// Set when the batch failed
    pub error: Option<String>,
    /// Schema objects present after the run
    pub schema: Vec<SchemaObject>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.applied()).count()
    }
}

/// Classification of one statement of a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub statement_type: String,
    pub statement: String,
}

/// Read a script file
pub fn load_script(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Connection options from an optional config file and flag overrides
pub fn load_options(config: Option<&Path>, timeout_ms: Option<u64>) -> Result<ConnectionOptions> {
    let mut options = match config {
        Some(path) => ConnectionOptions::from_json_file(path)?,
        None => ConnectionOptions::default(),
    };
    if let Some(timeout_ms) = timeout_ms {
        options.statement_timeout_ms = Some(timeout_ms);
    }
    options.validate()?;
    Ok(options)
}

/// Run every statement of `script` inside one DDL batch
///
/// Client-side settings such as `SET STATEMENT_TIMEOUT` are applied as they
/// appear. A failed batch is reported in the returned [`RunReport`], not as an
/// error.
pub async fn run_script(
    script: &str,
    options: ConnectionOptions,
    ddl_client: InMemoryDdlClient,
) -> Result<RunReport> {
    let parser = StatementParser::new();
    let statements = parser.split_script(script)?;
    let database = options.database.clone();
    let mut connection = Connection::new(
        options,
        Arc::new(ddl_client.clone()),
        Arc::new(InMemoryDatabaseClient::new()),
    )?;

    connection.start_batch_ddl()?;
    let mut buffered = Vec::new();
    for sql in &statements {
        let statement = parser.parse(sql)?;
        if matches!(
            statement.client_side_statement(),
            Some(ClientSideStatement::StartBatchDdl)
                | Some(ClientSideStatement::RunBatch)
                | Some(ClientSideStatement::AbortBatch)
        ) {
            connection.abort_batch()?;
            return Err(CliError::Script(format!(
                "'{}' is not allowed, the run command manages the batch",
                statement.sql_without_comments()
            )));
        }
        if let Err(e) = connection.execute(sql).await {
            connection.abort_batch()?;
            return Err(e.into());
        }
        if statement.is_ddl() {
            buffered.push(statement.sql_without_comments().to_string());
        }
    }

    info!("Running {} buffered statement(s)", buffered.len());
    let (update_counts, error) = match connection.run_batch().await {
        Ok(update_counts) => (update_counts, None),
        Err(ConnectionError::BatchUpdate(e)) => {
            let message = e.to_string();
            (e.update_counts, Some(message))
        }
        Err(e) => return Err(e.into()),
    };
    debug!("Batch update counts: {:?}", update_counts);

    let outcomes = buffered
        .into_iter()
        .zip(update_counts)
        .map(|(statement, update_count)| StatementOutcome {
            statement,
            update_count,
        })
        .collect();

    Ok(RunReport {
        database,
        outcomes,
        error,
        schema: ddl_client.schema_objects(),
    })
}

/// Classify every statement of `script`
pub fn classify_script(script: &str) -> Result<Vec<Classification>> {
    let parser = StatementParser::new();
    parser
        .split_script(script)?
        .iter()
        .map(|sql| {
            let statement = parser.parse(sql)?;
            Ok(Classification {
                statement_type: statement.statement_type().to_string(),
                statement: statement.sql_without_comments().to_string(),
            })
        })
        .collect()
}

/// Handle the run command
pub async fn handle_run(
    script: PathBuf,
    timeout_ms: Option<u64>,
    statement_delay_ms: u64,
    config: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let text = load_script(&script)?;
    let options = load_options(config.as_deref(), timeout_ms)?;
    let ddl_client =
        InMemoryDdlClient::new().with_statement_delay(Duration::from_millis(statement_delay_ms));

    if format == OutputFormat::Table {
        println!(
            "{}",
            format!("Running {} against database '{}'", script.display(), options.database)
                .bold()
                .green()
        );
    }

    let report = run_script(&text, options, ddl_client).await?;
    println!("{}", OutcomeFormatter::format_run(&report, format)?);

    match report.error {
        Some(error) => Err(CliError::BatchFailed(error)),
        None => Ok(()),
    }
}

/// Handle the classify command
pub fn handle_classify(script: PathBuf, format: OutputFormat) -> Result<()> {
    let text = load_script(&script)?;
    let classifications = classify_script(&text)?;
    println!(
        "{}",
        OutcomeFormatter::format_classifications(&classifications, format)?
    );
    Ok(())
}
