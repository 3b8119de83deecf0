// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-project session snapshot types.
//!
//! A SessionSnapshot is the JSON file an external worker writes while a
//! project runs: session identity, per-role agent state, and the
//! worker-declared completion status. This core reads snapshots and only
//! writes them on the two corrective paths (mirroring a reset, audit
//! repairs). Agent state is advisory and never drives queue decisions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Worker-declared outcome for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl CompletionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CompletionStatus::Completed | CompletionStatus::Failed)
    }
}

/// Advisory state of a single agent within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub role: String,
    pub window_index: u32,
    pub worktree_path: String,
    pub is_alive: bool,
    #[serde(default)]
    pub is_exhausted: bool,
    #[serde(default)]
    pub credit_reset_time: Option<String>,
    #[serde(default)]
    pub current_branch: Option<String>,
    #[serde(default)]
    pub commit_hash: Option<String>,
}

/// Snapshot of one project's session, owned by the external worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub session_name: Option<String>,
    pub project_path: String,
    pub project_name: String,
    #[serde(default)]
    pub agents: BTreeMap<String, AgentState>,
    #[serde(default)]
    pub completion_status: CompletionStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl SessionSnapshot {
    pub fn new(project_name: impl Into<String>, project_path: impl Into<String>) -> Self {
        Self {
            session_name: None,
            project_path: project_path.into(),
            project_name: project_name.into(),
            agents: BTreeMap::new(),
            completion_status: CompletionStatus::Pending,
            failure_reason: None,
        }
    }

    /// Mark the snapshot failed with a reason (mirror of a queue reset).
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.completion_status = CompletionStatus::Failed;
        self.failure_reason = Some(reason.into());
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
