// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Seams to the outside world: the terminal-multiplexer session registry
//! and the OS process table.
//!
//! Only the returned booleans and durations are part of the scheduler's
//! contract; invocation mechanics stay behind these traits. Queries are
//! short-timeout and best-effort: an error means "cannot confirm", which
//! callers fold into grace-period reasoning instead of raising.

mod proc;
mod tmux;

#[cfg(test)]
pub mod fake;

pub use proc::PsProcessTable;
pub use tmux::TmuxRegistry;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// A liveness or process-table query failed or timed out.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("command failed: {0}")]
    Command(String),

    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Registry of external multiplexer sessions.
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Whether a session with this name exists at all.
    async fn session_exists(&self, name: &str) -> Result<bool, QueryError>;

    /// Whether any constituent pane of the session has died.
    async fn has_dead_panes(&self, name: &str) -> Result<bool, QueryError>;

    /// Time since the session last saw activity.
    async fn idle_time(&self, name: &str) -> Result<Duration, QueryError>;

    /// Time since the session was created.
    async fn session_age(&self, name: &str) -> Result<Duration, QueryError>;

    /// Whether at least one live child process is attached to the session.
    async fn has_live_child(&self, name: &str) -> Result<bool, QueryError>;

    /// Names of all currently live sessions.
    async fn live_sessions(&self) -> Result<HashSet<String>, QueryError>;
}

/// The OS process table, queried by command-line match.
#[async_trait]
pub trait ProcessTable: Send + Sync {
    /// Whether a worker process for this project path is running.
    async fn worker_running(&self, project_path: &str) -> Result<bool, QueryError>;
}
