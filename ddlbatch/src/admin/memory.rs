// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory schema-change service
//!
//! Applies DDL statements to an in-memory catalog of schema objects, one at a
//! time on a background task, the way the remote service does. Only the object
//! names matter: column definitions are accepted without inspection.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

use super::{DdlClient, DdlMetadata, DdlOperation};
use crate::exec::{BoxError, ErrorCode, ServiceError};

/// Kind of a schema object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SchemaObjectKind {
    Table,
    Index,
    View,
    Role,
}

impl fmt::Display for SchemaObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaObjectKind::Table => "TABLE",
            SchemaObjectKind::Index => "INDEX",
            SchemaObjectKind::View => "VIEW",
            SchemaObjectKind::Role => "ROLE",
        };
        write!(f, "{}", name)
    }
}

/// Object created by a DDL statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaObject {
    pub kind: SchemaObjectKind,
    pub name: String,
    /// Table an index is defined on
    pub parent: Option<String>,
}

/// Failure of a long-running operation, caused by a service error
#[derive(Error, Debug)]
#[error("Operation {name} failed")]
pub struct OperationFailed {
    pub name: String,
    #[source]
    pub source: ServiceError,
}

/// Catalog keyed by kind and upper-cased name
#[derive(Debug, Default)]
struct Catalog {
    objects: BTreeMap<(SchemaObjectKind, String), SchemaObject>,
}

impl Catalog {
    fn contains(&self, kind: SchemaObjectKind, name: &str) -> bool {
        self.objects.contains_key(&(kind, name.to_ascii_uppercase()))
    }

    fn insert(&mut self, kind: SchemaObjectKind, name: &str, parent: Option<String>) {
        self.objects.insert(
            (kind, name.to_ascii_uppercase()),
            SchemaObject {
                kind,
                name: name.to_string(),
                parent,
            },
        );
    }

    fn remove(&mut self, kind: SchemaObjectKind, name: &str) {
        self.objects.remove(&(kind, name.to_ascii_uppercase()));
    }

    fn indexes_on(&self, table: &str) -> Vec<String> {
        self.objects
            .values()
            .filter(|object| {
                object.kind == SchemaObjectKind::Index
                    && object
                        .parent
                        .as_deref()
                        .is_some_and(|parent| parent.eq_ignore_ascii_case(table))
            })
            .map(|object| object.name.clone())
            .collect()
    }

    /// Apply one statement, leaving the catalog untouched on error
    fn apply(&mut self, statement: &str) -> Result<(), ServiceError> {
        let spaced = statement.replace('(', " ( ").replace(')', " ) ");
        let tokens: Vec<&str> = spaced.split_whitespace().collect();
        let upper: Vec<String> = tokens.iter().map(|t| t.to_ascii_uppercase()).collect();
        let keywords: Vec<&str> = upper.iter().map(String::as_str).collect();

        match keywords.first().copied() {
            Some("CREATE") => self.apply_create(statement, &tokens, &keywords),
            Some("DROP") => self.apply_drop(statement, &tokens, &keywords),
            Some("ALTER") => self.apply_alter(statement, &tokens, &keywords),
            Some(_) => Ok(()),
            None => Err(parse_error(statement)),
        }
    }

    fn apply_create(
        &mut self,
        statement: &str,
        tokens: &[&str],
        keywords: &[&str],
    ) -> Result<(), ServiceError> {
        let mut position = 1;
        let mut or_replace = false;
        if keywords.get(1..3) == Some(&["OR", "REPLACE"][..]) {
            or_replace = true;
            position = 3;
        }
        while matches!(keywords.get(position), Some(&"UNIQUE") | Some(&"NULL_FILTERED")) {
            position += 1;
        }

        let kind = object_kind(keywords.get(position).copied()).ok_or_else(|| parse_error(statement))?;
        position += 1;
        let if_not_exists = keywords.get(position..position + 3) == Some(&["IF", "NOT", "EXISTS"][..]);
        if if_not_exists {
            position += 3;
        }
        let name = object_name(tokens.get(position)).ok_or_else(|| parse_error(statement))?;

        if self.contains(kind, &name) {
            if if_not_exists {
                return Ok(());
            }
            if !or_replace {
                return Err(ServiceError::new(
                    ErrorCode::AlreadyExists,
                    format!("Duplicate name in schema: {}.", name),
                ));
            }
        }

        let parent = if kind == SchemaObjectKind::Index {
            let on = keywords[position..]
                .iter()
                .position(|keyword| *keyword == "ON")
                .map(|offset| position + offset)
                .ok_or_else(|| parse_error(statement))?;
            let table = object_name(tokens.get(on + 1)).ok_or_else(|| parse_error(statement))?;
            if !self.contains(SchemaObjectKind::Table, &table) {
                return Err(ServiceError::new(
                    ErrorCode::NotFound,
                    format!("Table not found: {}", table),
                ));
            }
            Some(table)
        } else {
            None
        };

        self.insert(kind, &name, parent);
        Ok(())
    }

    fn apply_drop(
        &mut self,
        statement: &str,
        tokens: &[&str],
        keywords: &[&str],
    ) -> Result<(), ServiceError> {
        let kind = object_kind(keywords.get(1).copied()).ok_or_else(|| parse_error(statement))?;
        let if_exists = keywords.get(2..4) == Some(&["IF", "EXISTS"][..]);
        let position = if if_exists { 4 } else { 2 };
        let name = object_name(tokens.get(position)).ok_or_else(|| parse_error(statement))?;

        if !self.contains(kind, &name) {
            if if_exists {
                return Ok(());
            }
            return Err(ServiceError::new(
                ErrorCode::NotFound,
                format!("{} not found: {}", kind, name),
            ));
        }
        if kind == SchemaObjectKind::Table {
            let indexes = self.indexes_on(&name);
            if !indexes.is_empty() {
                return Err(ServiceError::new(
                    ErrorCode::FailedPrecondition,
                    format!(
                        "Cannot drop table {} with indices: {}.",
                        name,
                        indexes.join(", ")
                    ),
                ));
            }
        }

        self.remove(kind, &name);
        Ok(())
    }

    fn apply_alter(
        &mut self,
        statement: &str,
        tokens: &[&str],
        keywords: &[&str],
    ) -> Result<(), ServiceError> {
        let Some(kind) = object_kind(keywords.get(1).copied()) else {
            // ALTER DATABASE and friends do not touch the catalog
            return Ok(());
        };
        let name = object_name(tokens.get(2)).ok_or_else(|| parse_error(statement))?;
        if !self.contains(kind, &name) {
            return Err(ServiceError::new(
                ErrorCode::NotFound,
                format!("{} not found: {}", kind, name),
            ));
        }
        Ok(())
    }
}

fn object_kind(keyword: Option<&str>) -> Option<SchemaObjectKind> {
    match keyword? {
        "TABLE" => Some(SchemaObjectKind::Table),
        "INDEX" => Some(SchemaObjectKind::Index),
        "VIEW" => Some(SchemaObjectKind::View),
        "ROLE" => Some(SchemaObjectKind::Role),
        _ => None,
    }
}

fn object_name(token: Option<&&str>) -> Option<String> {
    let name = token?.trim_matches(|c| c == '`' || c == '"');
    if name.is_empty() || name == "(" {
        None
    } else {
        Some(name.to_string())
    }
}

fn parse_error(statement: &str) -> ServiceError {
    ServiceError::new(
        ErrorCode::InvalidArgument,
        format!("Error parsing DDL statement: {}", statement),
    )
}

/// Schema-change service backed by an in-memory catalog
#[derive(Clone, Default)]
pub struct InMemoryDdlClient {
    catalog: Arc<Mutex<Catalog>>,
    submissions: Arc<Mutex<Vec<Vec<String>>>>,
    statement_delay: Duration,
}

impl InMemoryDdlClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before applying each statement
    pub fn with_statement_delay(mut self, delay: Duration) -> Self {
        self.statement_delay = delay;
        self
    }

    /// All objects currently in the catalog, ordered by kind and name
    pub fn schema_objects(&self) -> Vec<SchemaObject> {
        self.catalog.lock().objects.values().cloned().collect()
    }

    pub fn object_exists(&self, kind: SchemaObjectKind, name: &str) -> bool {
        self.catalog.lock().contains(kind, name)
    }

    /// Statement lists submitted so far, one entry per operation
    pub fn submissions(&self) -> Vec<Vec<String>> {
        self.submissions.lock().clone()
    }
}

#[async_trait]
impl DdlClient for InMemoryDdlClient {
    async fn execute_ddl(&self, statements: &[String]) -> Result<Box<dyn DdlOperation>, BoxError> {
        let name = format!("operations/ddl-{}", Uuid::new_v4());
        info!(
            "Starting schema-change operation {} with {} statement(s)",
            name,
            statements.len()
        );
        self.submissions.lock().push(statements.to_vec());

        let metadata = Arc::new(Mutex::new(DdlMetadata::new(statements.to_vec())));
        let (done_tx, done_rx) = watch::channel(None);

        let catalog = Arc::clone(&self.catalog);
        let task_metadata = Arc::clone(&metadata);
        let task_statements = statements.to_vec();
        let delay = self.statement_delay;
        let task_name = name.clone();
        tokio::spawn(async move {
            let outcome = apply_statements(&catalog, &task_metadata, &task_statements, delay).await;
            match &outcome {
                Ok(()) => debug!("Operation {} finished", task_name),
                Err(e) => warn!("Operation {} failed: {}", task_name, e),
            }
            let _ = done_tx.send(Some(outcome));
        });

        Ok(Box::new(InMemoryDdlOperation {
            name,
            metadata,
            done: done_rx,
        }))
    }
}

async fn apply_statements(
    catalog: &Mutex<Catalog>,
    metadata: &Mutex<DdlMetadata>,
    statements: &[String],
    delay: Duration,
) -> Result<(), ServiceError> {
    for (index, statement) in statements.iter().enumerate() {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        catalog.lock().apply(statement)?;
        metadata.lock().record_commit(index, Utc::now());
    }
    Ok(())
}

struct InMemoryDdlOperation {
    name: String,
    metadata: Arc<Mutex<DdlMetadata>>,
    done: watch::Receiver<Option<Result<(), ServiceError>>>,
}

#[async_trait]
impl DdlOperation for InMemoryDdlOperation {
    fn name(&self) -> &str {
        &self.name
    }

    async fn wait(&self) -> Result<(), BoxError> {
        let mut done = self.done.clone();
        loop {
            let outcome = done.borrow_and_update().clone();
            if let Some(outcome) = outcome {
                return outcome.map_err(|source| {
                    Box::new(OperationFailed {
                        name: self.name.clone(),
                        source,
                    }) as BoxError
                });
            }
            if done.changed().await.is_err() {
                return Err(Box::new(ServiceError::new(
                    ErrorCode::Internal,
                    format!("Operation {} was abandoned", self.name),
                )));
            }
        }
    }

    async fn metadata(&self) -> Result<DdlMetadata, BoxError> {
        Ok(self.metadata.lock().clone())
    }
}
