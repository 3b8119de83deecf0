// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State mismatch taxonomy produced by the audit pass.
//!
//! The audit cross-checks three sources of truth: queue rows, snapshot
//! files, and the live-session set. Disagreements are reported as one of
//! exactly five mismatch kinds, each with a fixed severity and a single
//! recommended action from a closed set. Mismatches are transient report
//! records, never persisted.

use crate::project::ProjectStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a detected mismatch, fixed per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchSeverity {
    Critical,
    Warning,
    Info,
}

impl fmt::Display for MismatchSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MismatchSeverity::Critical => "critical",
            MismatchSeverity::Warning => "warning",
            MismatchSeverity::Info => "info",
        };
        write!(f, "{}", s)
    }
}

/// Closed set of repair actions the audit may recommend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    RepairSessionNameFromJsonOrResetToQueued,
    CleanupOrphanedJsonState,
    CleanupStaleJsonState,
    ResetProjectToFailedOrQueued,
    VerifySessionConsistency,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::RepairSessionNameFromJsonOrResetToQueued => {
                "repair_session_name_from_json_or_reset_to_queued"
            }
            RecommendedAction::CleanupOrphanedJsonState => "cleanup_orphaned_json_state",
            RecommendedAction::CleanupStaleJsonState => "cleanup_stale_json_state",
            RecommendedAction::ResetProjectToFailedOrQueued => "reset_project_to_failed_or_queued",
            RecommendedAction::VerifySessionConsistency => "verify_session_consistency",
        }
    }
}

impl fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected disagreement among the queue, the snapshot store, and the
/// live-session set. Each variant carries only the fields relevant to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateMismatch {
    /// Row is `processing` but has no session name assigned.
    MissingSessionName { project_id: i64, project_path: String },
    /// Snapshot names a session that no queue row references.
    OrphanedJson { project_name: String, session_name: String },
    /// Snapshot matches a row, but the row is no longer `processing`.
    StaleJsonState { project_id: i64, project_name: String, status: ProjectStatus },
    /// Row is `processing` but its named session is not in the live set.
    DeadTmuxSession { project_id: i64, session_name: String },
    /// Row and snapshot share a session name but disagree on project path.
    SessionNameMismatch {
        project_id: i64,
        session_name: String,
        queue_project_path: String,
        snapshot_project_path: String,
    },
}

impl StateMismatch {
    pub fn severity(&self) -> MismatchSeverity {
        match self {
            StateMismatch::MissingSessionName { .. } => MismatchSeverity::Critical,
            StateMismatch::OrphanedJson { .. } => MismatchSeverity::Warning,
            StateMismatch::StaleJsonState { .. } => MismatchSeverity::Info,
            StateMismatch::DeadTmuxSession { .. } => MismatchSeverity::Critical,
            StateMismatch::SessionNameMismatch { .. } => MismatchSeverity::Warning,
        }
    }

    pub fn recommended_action(&self) -> RecommendedAction {
        match self {
            StateMismatch::MissingSessionName { .. } => {
                RecommendedAction::RepairSessionNameFromJsonOrResetToQueued
            }
            StateMismatch::OrphanedJson { .. } => RecommendedAction::CleanupOrphanedJsonState,
            StateMismatch::StaleJsonState { .. } => RecommendedAction::CleanupStaleJsonState,
            StateMismatch::DeadTmuxSession { .. } => RecommendedAction::ResetProjectToFailedOrQueued,
            StateMismatch::SessionNameMismatch { .. } => {
                RecommendedAction::VerifySessionConsistency
            }
        }
    }

    /// Queue row this mismatch points at, when it concerns one.
    pub fn project_id(&self) -> Option<i64> {
        match self {
            StateMismatch::MissingSessionName { project_id, .. }
            | StateMismatch::StaleJsonState { project_id, .. }
            | StateMismatch::DeadTmuxSession { project_id, .. }
            | StateMismatch::SessionNameMismatch { project_id, .. } => Some(*project_id),
            StateMismatch::OrphanedJson { .. } => None,
        }
    }

    /// Human-facing one-line description.
    pub fn description(&self) -> String {
        match self {
            StateMismatch::MissingSessionName { project_id, project_path } => {
                format!("project {} ({}) is processing without a session name", project_id, project_path)
            }
            StateMismatch::OrphanedJson { project_name, session_name } => {
                format!("snapshot for {} names session {} but no queue row matches", project_name, session_name)
            }
            StateMismatch::StaleJsonState { project_id, project_name, status } => {
                format!("snapshot for {} lingers while project {} is {}", project_name, project_id, status)
            }
            StateMismatch::DeadTmuxSession { project_id, session_name } => {
                format!("project {} references session {} which is not alive", project_id, session_name)
            }
            StateMismatch::SessionNameMismatch {
                project_id,
                session_name,
                queue_project_path,
                snapshot_project_path,
            } => format!(
                "session {} on project {}: queue says {}, snapshot says {}",
                session_name, project_id, queue_project_path, snapshot_project_path
            ),
        }
    }
}

#[cfg(test)]
#[path = "mismatch_tests.rs"]
mod tests;
