// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Output formatting for CLI results

use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};

use super::commands::OutputFormat;
use super::error::Result;
use super::handlers::{Classification, RunReport};

/// Renders command results as tables or JSON
pub struct OutcomeFormatter;

impl OutcomeFormatter {
    /// Format the outcome of a batch run
    pub fn format_run(report: &RunReport, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Table => Ok(Self::run_table(report)),
        }
    }

    /// Format statement classifications
    pub fn format_classifications(
        classifications: &[Classification],
        format: OutputFormat,
    ) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(classifications)?),
            OutputFormat::Table => {
                let mut table = Self::new_table(&["#", "Type", "Statement"]);
                for (index, classification) in classifications.iter().enumerate() {
                    table.add_row(vec![
                        Cell::new(index + 1),
                        Cell::new(&classification.statement_type),
                        Cell::new(&classification.statement),
                    ]);
                }
                Ok(table.to_string())
            }
        }
    }

    fn run_table(report: &RunReport) -> String {
        let mut outcomes = Self::new_table(&["#", "Statement", "Applied"]);
        for (index, outcome) in report.outcomes.iter().enumerate() {
            let applied = if outcome.applied() {
                Cell::new("yes").fg(Color::Green)
            } else {
                Cell::new("no").fg(Color::Red)
            };
            outcomes.add_row(vec![
                Cell::new(index + 1),
                Cell::new(&outcome.statement),
                applied,
            ]);
        }

        let mut schema = Self::new_table(&["Kind", "Name", "Table"]);
        for object in &report.schema {
            schema.add_row(vec![
                Cell::new(object.kind),
                Cell::new(&object.name),
                Cell::new(object.parent.as_deref().unwrap_or("")),
            ]);
        }

        let summary = format!(
            "{} of {} statement(s) applied",
            report.applied_count(),
            report.outcomes.len()
        );
        let summary = match &report.error {
            None => summary.green().to_string(),
            Some(error) => format!("{}\n{}", summary.yellow(), error.red()),
        };

        format!("{}\n{}\n\nSchema:\n{}", outcomes, summary, schema)
    }

    fn new_table(header: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(header.to_vec());
        table
    }
}
