// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-demand cross-store consistency audit.
//!
//! Compares every queue row, every snapshot file, and the current
//! live-session set, and reports disagreements as the fixed five-kind
//! mismatch taxonomy. Inconsistency is data, not an exception: detection
//! never fails a pass because one row is bad. Repairs are narrow,
//! idempotent, and entirely skipped under dry-run.

use std::collections::HashSet;
use std::fmt;

use tracing::{info, warn};

use fm_core::{
    Clock, MismatchSeverity, ProjectQueueEntry, ProjectStatus, SessionSnapshot, StateMismatch,
};
use fm_storage::StorageError;

use crate::adapters::{ProcessTable, SessionRegistry};
use crate::liveness::REASON_NO_SESSION;
use crate::service::Scheduler;

/// Result of one audit pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditReport {
    pub mismatches: Vec<StateMismatch>,
    /// Number of mismatches actually repaired (zero under dry-run).
    pub repaired: usize,
    pub dry_run: bool,
}

impl AuditReport {
    /// Findings grouped by severity, most severe first.
    pub fn by_severity(&self) -> Vec<(MismatchSeverity, Vec<&StateMismatch>)> {
        let mut groups = Vec::new();
        for severity in
            [MismatchSeverity::Critical, MismatchSeverity::Warning, MismatchSeverity::Info]
        {
            let found: Vec<&StateMismatch> =
                self.mismatches.iter().filter(|m| m.severity() == severity).collect();
            if !found.is_empty() {
                groups.push((severity, found));
            }
        }
        groups
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches.is_empty()
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(f, "state audit: no mismatches");
        }
        let mode = if self.dry_run { "dry-run" } else { "applied" };
        writeln!(f, "state audit ({mode}): {} mismatch(es)", self.mismatches.len())?;
        for (severity, group) in self.by_severity() {
            writeln!(f, "[{severity}]")?;
            for mismatch in group {
                writeln!(f, "  - {} (action: {})", mismatch.description(), mismatch.recommended_action())?;
            }
        }
        if !self.dry_run {
            writeln!(f, "repaired: {}", self.repaired)?;
        }
        Ok(())
    }
}

impl<S, P, C> Scheduler<S, P, C>
where
    S: SessionRegistry,
    P: ProcessTable,
    C: Clock,
{
    /// Detect mismatches between the queue, the snapshot store, and the
    /// live-session set; repair them unless `dry_run`.
    pub async fn audit(&self, dry_run: bool) -> Result<AuditReport, StorageError> {
        let rows = self.queue.list()?;
        let snapshots = self.snapshots.store().list()?;
        let live = match self.sessions.live_sessions().await {
            Ok(live) => live,
            Err(e) => {
                // cannot confirm the live set; skip session-based findings
                // rather than reporting every session dead
                warn!("live-session query failed, auditing stores only: {e}");
                rows.iter().filter_map(|r| r.session_name.clone()).collect()
            }
        };

        let mismatches = detect(&rows, &snapshots, &live);

        let mut repaired = 0;
        if !dry_run {
            for mismatch in &mismatches {
                match self.repair(mismatch) {
                    Ok(true) => repaired += 1,
                    Ok(false) => {}
                    Err(e) => warn!("repair failed for {}: {e}", mismatch.description()),
                }
            }
        }

        Ok(AuditReport { mismatches, repaired, dry_run })
    }

    /// Apply the one recommended action for a mismatch. Returns whether
    /// anything was mutated.
    fn repair(&self, mismatch: &StateMismatch) -> Result<bool, StorageError> {
        match mismatch {
            StateMismatch::MissingSessionName { project_id, project_path } => {
                match self.snapshots.store().find_by_project_path(project_path)? {
                    Some(SessionSnapshot { session_name: Some(name), .. }) => {
                        self.queue.update_session_name(*project_id, &name)?;
                        info!(project_id, session = %name, "repaired session name from snapshot");
                        Ok(true)
                    }
                    _ => {
                        // nothing to copy; give the project a fresh start
                        let changed = self.queue.requeue(*project_id)?;
                        if changed {
                            info!(project_id, "no snapshot to repair from, requeued project");
                        }
                        Ok(changed)
                    }
                }
            }
            StateMismatch::OrphanedJson { project_name, .. }
            | StateMismatch::StaleJsonState { project_name, .. } => {
                self.snapshots.store().remove(project_name)?;
                self.snapshots.invalidate(project_name);
                info!(project = %project_name, "removed lingering snapshot");
                Ok(true)
            }
            StateMismatch::DeadTmuxSession { project_id, .. } => {
                self.reset_project(*project_id, REASON_NO_SESSION)
            }
            StateMismatch::SessionNameMismatch {
                project_id,
                session_name,
                queue_project_path,
                snapshot_project_path,
            } => {
                // neither store is provably right; verification only
                warn!(
                    project_id,
                    session = %session_name,
                    queue_path = %queue_project_path,
                    snapshot_path = %snapshot_project_path,
                    "session name maps to diverging project paths",
                );
                Ok(false)
            }
        }
    }
}

/// Pure detection over in-memory views of the three sources.
fn detect(
    rows: &[ProjectQueueEntry],
    snapshots: &[SessionSnapshot],
    live: &HashSet<String>,
) -> Vec<StateMismatch> {
    let mut mismatches = Vec::new();

    for row in rows {
        if row.status != ProjectStatus::Processing {
            continue;
        }
        match row.session_name.as_deref() {
            None => mismatches.push(StateMismatch::MissingSessionName {
                project_id: row.id,
                project_path: row.project_path.clone(),
            }),
            Some(session) => {
                if !live.contains(session) {
                    mismatches.push(StateMismatch::DeadTmuxSession {
                        project_id: row.id,
                        session_name: session.to_string(),
                    });
                }
            }
        }
    }

    for snapshot in snapshots {
        let Some(session) = snapshot.session_name.as_deref() else {
            continue;
        };
        let matching_row = rows.iter().find(|r| r.session_name.as_deref() == Some(session));
        match matching_row {
            None => {
                // a processing row sharing the project path is the
                // missing-session-name case, not an orphan; repairing that
                // row adopts this snapshot
                let adoptable = rows.iter().any(|r| {
                    r.status == ProjectStatus::Processing
                        && r.session_name.is_none()
                        && r.project_path == snapshot.project_path
                });
                if !adoptable {
                    mismatches.push(StateMismatch::OrphanedJson {
                        project_name: snapshot.project_name.clone(),
                        session_name: session.to_string(),
                    });
                }
            }
            Some(row) if row.status != ProjectStatus::Processing => {
                mismatches.push(StateMismatch::StaleJsonState {
                    project_id: row.id,
                    project_name: snapshot.project_name.clone(),
                    status: row.status,
                });
            }
            Some(row) => {
                if row.project_path != snapshot.project_path {
                    mismatches.push(StateMismatch::SessionNameMismatch {
                        project_id: row.id,
                        session_name: session.to_string(),
                        queue_project_path: row.project_path.clone(),
                        snapshot_project_path: snapshot.project_path.clone(),
                    });
                }
            }
        }
    }

    mismatches
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
