// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OS process table queries via `ps`.

use async_trait::async_trait;

use super::tmux::run_with_timeout;
use super::{ProcessTable, QueryError};

/// Process table backed by `ps`, matching worker processes by their
/// command line.
#[derive(Debug, Clone)]
pub struct PsProcessTable {
    /// Substring identifying a worker command (the worker binary name).
    worker_pattern: String,
}

impl PsProcessTable {
    pub fn new(worker_pattern: impl Into<String>) -> Self {
        Self { worker_pattern: worker_pattern.into() }
    }
}

impl Default for PsProcessTable {
    fn default() -> Self {
        Self::new("foreman-worker")
    }
}

#[async_trait]
impl ProcessTable for PsProcessTable {
    async fn worker_running(&self, project_path: &str) -> Result<bool, QueryError> {
        let output = run_with_timeout("ps", &["-eo", "args="]).await?;
        if !output.status.success() {
            return Err(QueryError::Command("ps failed".to_string()));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .any(|line| line.contains(&self.worker_pattern) && line.contains(project_path)))
    }
}
