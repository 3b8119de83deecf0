// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scheduler service object.
//!
//! One explicit `Scheduler` is constructed at process start and shared by
//! reference with the monitor and heartbeat tasks; there are no ambient
//! globals. It owns the two stores, the adapters, the event bus, and the
//! clock, and provides the one cross-store write both the sweep and the
//! audit use: the reset-to-failed transaction.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use fm_core::{Clock, Event, EventBus, ProjectStatus, SessionSnapshot};
use fm_storage::{QueueStore, SnapshotCache, StorageError};

use crate::adapters::{ProcessTable, SessionRegistry};
use crate::config::Config;
use crate::liveness::SESSION_GRACE_PERIOD;

/// Shared scheduler state and collaborators.
pub struct Scheduler<S, P, C: Clock> {
    pub queue: QueueStore,
    pub snapshots: SnapshotCache<C>,
    pub sessions: S,
    pub processes: P,
    pub events: EventBus,
    pub clock: C,
    /// Monitor interval while no project is processing.
    pub idle_interval: Duration,
    /// Hard ceiling for a processing row regardless of liveness.
    pub processing_timeout: Duration,
    /// Post-creation window during which liveness checks are relaxed.
    pub session_grace: Duration,
}

impl<S, P, C> Scheduler<S, P, C>
where
    S: SessionRegistry,
    P: ProcessTable,
    C: Clock,
{
    pub fn new(
        config: &Config,
        queue: QueueStore,
        snapshots: SnapshotCache<C>,
        sessions: S,
        processes: P,
        clock: C,
    ) -> Self {
        Self {
            queue,
            snapshots,
            sessions,
            processes,
            events: EventBus::new(),
            clock,
            idle_interval: config.idle_interval,
            processing_timeout: config.processing_timeout,
            session_grace: SESSION_GRACE_PERIOD,
        }
    }

    /// Project name a queue row's snapshot file is keyed by: the last
    /// component of the project path.
    pub(crate) fn project_name_of(project_path: &str) -> &str {
        Path::new(project_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(project_path)
    }

    /// Snapshot for a queue row, through the read cache, falling back to a
    /// project-path scan when the name-derived path has no file.
    pub(crate) fn snapshot_for(
        &self,
        project_path: &str,
    ) -> Result<Option<SessionSnapshot>, StorageError> {
        if let Some(snapshot) = self.snapshots.load(Self::project_name_of(project_path))? {
            return Ok(Some(snapshot));
        }
        self.snapshots.store().find_by_project_path(project_path)
    }

    /// The reset transaction shared by the sweep and the audit: fail the
    /// row with a reason, mirror the failure onto its snapshot when one
    /// exists, and announce completion. Returns false (and does nothing)
    /// when the row already left `processing`, which keeps re-runs
    /// harmless.
    pub fn reset_project(&self, id: i64, reason: &str) -> Result<bool, StorageError> {
        if !self.queue.reset_to_failed(&self.clock, id, reason)? {
            return Ok(false);
        }
        let entry = self.queue.get(id)?;
        info!(project_id = id, reason, "reset project to failed");

        let name = Self::project_name_of(&entry.project_path);
        let found = match self.snapshots.store().load(name) {
            Ok(Some(snapshot)) => Some(snapshot),
            Ok(None) => match self.snapshots.store().find_by_project_path(&entry.project_path) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(project_id = id, "failed to scan snapshots while resetting: {e}");
                    None
                }
            },
            Err(e) => {
                warn!(project_id = id, "failed to read snapshot while resetting: {e}");
                None
            }
        };
        if let Some(mut snapshot) = found {
            snapshot.mark_failed(reason);
            if let Err(e) = self.snapshots.store().store(&snapshot) {
                warn!(project_id = id, "failed to mirror reset onto snapshot: {e}");
            }
            self.snapshots.invalidate(&snapshot.project_name);
            self.snapshots.invalidate(name);
        }

        self.events.dispatch(&Event::ProjectComplete {
            project_id: id,
            status: ProjectStatus::Failed,
            reason: Some(reason.to_string()),
        });
        Ok(true)
    }
}
