// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project queue entry types.
//!
//! A ProjectQueueEntry is one row of the SQL queue. Rows are created as
//! `queued`, moved to `processing` by an external worker (which later
//! assigns a session name), and finished exactly once as `completed` xor
//! `failed`. Terminal transitions are never reversed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a queued project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ProjectStatus {
    /// Stable lowercase form used in the SQL schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Queued => "queued",
            ProjectStatus::Processing => "processing",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(ProjectStatus::Queued),
            "processing" => Some(ProjectStatus::Processing),
            "completed" => Some(ProjectStatus::Completed),
            "failed" => Some(ProjectStatus::Failed),
            _ => None,
        }
    }

    /// Terminal statuses are exclusive-or and never reversed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Completed | ProjectStatus::Failed)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of the project queue.
///
/// Timestamps are epoch milliseconds. Invariant: `completed_at` is set iff
/// the status is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectQueueEntry {
    pub id: i64,
    pub spec_path: String,
    pub project_path: String,
    pub status: ProjectStatus,
    pub queued_at: u64,
    pub started_at: Option<u64>,
    pub completed_at: Option<u64>,
    pub error_message: Option<String>,
    pub batch_id: Option<String>,
    pub session_name: Option<String>,
    pub orchestrator_session: Option<String>,
    pub main_session: Option<String>,
}

impl ProjectQueueEntry {
    /// Best-known session identifier for liveness checks:
    /// orchestrator session, then main session, then the worker-assigned
    /// session name.
    pub fn resolved_session(&self) -> Option<&str> {
        self.orchestrator_session
            .as_deref()
            .or(self.main_session.as_deref())
            .or(self.session_name.as_deref())
    }

    /// Whether the `completed_at` iff terminal invariant holds.
    pub fn timestamps_consistent(&self) -> bool {
        self.completed_at.is_some() == self.status.is_terminal()
    }
}

#[cfg(test)]
#[path = "project_tests.rs"]
mod tests;
