// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cancellable, timeout-aware execution frame for statements
//!
//! A statement body runs inside [`StatementExecutor::execute`]. The frame races
//! the body against the statement timeout and an explicit [`cancel`] call.
//! When either fires, the body's [`ExecutionContext`] is signalled and the body
//! gets a grace period to wind down and report what it knows, e.g. the
//! statements of a DDL batch that were already applied.
//!
//! [`cancel`]: StatementExecutor::cancel

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::error::{ConnectionError, ErrorCode, Result};
use crate::statement::ParsedStatement;

/// Time a signalled body gets to return before the frame gives up on it
pub const DEFAULT_CANCEL_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Handle passed to a running statement body
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    token: CancellationToken,
}

impl ExecutionContext {
    /// Completes once the statement has been cancelled or has timed out
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interruption {
    Cancelled,
    TimedOut(Duration),
}

impl Interruption {
    /// Adjust the error a signalled body returned
    fn rewrite(self, error: ConnectionError, statement: &ParsedStatement) -> ConnectionError {
        match (self, error) {
            (Interruption::TimedOut(timeout), ConnectionError::BatchUpdate(mut e))
                if e.code == ErrorCode::Cancelled =>
            {
                e.code = ErrorCode::DeadlineExceeded;
                e.message = timeout_message(statement, timeout);
                ConnectionError::BatchUpdate(e)
            }
            (Interruption::TimedOut(timeout), ConnectionError::Service(e))
                if e.code == ErrorCode::Cancelled =>
            {
                ConnectionError::service(
                    ErrorCode::DeadlineExceeded,
                    timeout_message(statement, timeout),
                )
            }
            (_, error) => error,
        }
    }

    /// Error for a body that did not return within the grace period
    fn into_error(self, statement: &ParsedStatement) -> ConnectionError {
        match self {
            Interruption::Cancelled => ConnectionError::service(
                ErrorCode::Cancelled,
                format!(
                    "Statement execution was cancelled: {}",
                    statement.sql_without_comments()
                ),
            ),
            Interruption::TimedOut(timeout) => ConnectionError::service(
                ErrorCode::DeadlineExceeded,
                timeout_message(statement, timeout),
            ),
        }
    }
}

fn timeout_message(statement: &ParsedStatement, timeout: Duration) -> String {
    format!(
        "Statement execution timeout occurred for {} after {:?}",
        statement.sql_without_comments(),
        timeout
    )
}

struct ExecutorInner {
    statement_timeout: RwLock<Option<Duration>>,
    cancel_grace_period: RwLock<Duration>,
    next_id: AtomicU64,
    running: Mutex<Vec<(u64, CancellationToken)>>,
}

/// Removes its own entry from the running set when the execution ends or is
/// dropped
struct RunningStatement {
    id: u64,
    inner: Arc<ExecutorInner>,
}

impl RunningStatement {
    fn register(inner: &Arc<ExecutorInner>, token: CancellationToken) -> Self {
        let id = inner.next_id.fetch_add(1, Ordering::Relaxed);
        inner.running.lock().push((id, token));
        Self {
            id,
            inner: Arc::clone(inner),
        }
    }
}

impl Drop for RunningStatement {
    fn drop(&mut self) {
        self.inner
            .running
            .lock()
            .retain(|(id, _)| *id != self.id);
    }
}

/// Execution frame shared by a connection and its units of work
///
/// Cloning yields another handle to the same frame, so a clone held by another
/// task can cancel the statement that is currently running.
#[derive(Clone)]
pub struct StatementExecutor {
    inner: Arc<ExecutorInner>,
}

impl Default for StatementExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementExecutor {
    /// Create a frame without a statement timeout
    pub fn new() -> Self {
        Self::with_timeouts(None, DEFAULT_CANCEL_GRACE_PERIOD)
    }

    pub fn with_timeouts(statement_timeout: Option<Duration>, cancel_grace_period: Duration) -> Self {
        Self {
            inner: Arc::new(ExecutorInner {
                statement_timeout: RwLock::new(statement_timeout),
                cancel_grace_period: RwLock::new(cancel_grace_period),
                next_id: AtomicU64::new(0),
                running: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        *self.inner.statement_timeout.read()
    }

    /// Set the timeout applied to statements started after this call
    pub fn set_statement_timeout(&self, timeout: Option<Duration>) {
        *self.inner.statement_timeout.write() = timeout;
    }

    pub fn cancel_grace_period(&self) -> Duration {
        *self.inner.cancel_grace_period.read()
    }

    pub fn set_cancel_grace_period(&self, grace_period: Duration) {
        *self.inner.cancel_grace_period.write() = grace_period;
    }

    /// Whether a statement is currently executing in this frame
    pub fn is_running(&self) -> bool {
        !self.inner.running.lock().is_empty()
    }

    /// Cancel every running statement, returns false when nothing was running
    pub fn cancel(&self) -> bool {
        let running = self.inner.running.lock();
        for (_, token) in running.iter() {
            token.cancel();
        }
        debug!("Cancelled {} running statement(s)", running.len());
        !running.is_empty()
    }

    /// Run `body` for `statement` under the timeout and cancellation rules
    pub async fn execute<T, F, Fut>(&self, statement: &ParsedStatement, body: F) -> Result<T>
    where
        F: FnOnce(ExecutionContext) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let token = CancellationToken::new();
        let _running = RunningStatement::register(&self.inner, token.clone());
        let timeout = self.statement_timeout();

        let body = body(ExecutionContext {
            token: token.clone(),
        });
        tokio::pin!(body);

        let interruption = tokio::select! {
            biased;
            result = &mut body => return result,
            _ = token.cancelled() => Interruption::Cancelled,
            _ = sleep_or_forever(timeout) => Interruption::TimedOut(timeout.unwrap_or_default()),
        };

        token.cancel();
        warn!(
            "Statement {} interrupted ({:?}), waiting for it to wind down",
            statement.sql_without_comments(),
            interruption
        );

        match tokio::time::timeout(self.cancel_grace_period(), &mut body).await {
            Ok(result) => result.map_err(|e| interruption.rewrite(e, statement)),
            Err(_) => {
                warn!(
                    "Statement {} did not finish within the grace period",
                    statement.sql_without_comments()
                );
                Err(interruption.into_error(statement))
            }
        }
    }
}

async fn sleep_or_forever(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending::<()>().await,
    }
}
