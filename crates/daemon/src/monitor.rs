// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Phantom/stuck project detection and completion relay.
//!
//! The monitor loop sweeps `processing` rows on an adaptive interval:
//! every 10 seconds while anything is processing, the configured idle
//! interval otherwise. Each sweep runs phantom/stuck detection, then
//! copies worker-declared completion from snapshots into the queue. Every
//! per-row check is isolated so one bad row cannot abort the sweep, and
//! sweeps are idempotent: a row already out of `processing` is a no-op on
//! re-check.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fm_core::{Clock, CompletionStatus, Event, ProjectQueueEntry, ProjectStatus};
use fm_storage::StorageError;

use crate::adapters::{ProcessTable, SessionRegistry};
use crate::liveness::validate_liveness;
use crate::service::Scheduler;

/// Sweep interval while at least one row is processing.
pub const ACTIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Rows younger than this are left alone: the worker may still be
/// attaching sessions.
pub const STARTUP_GRACE: Duration = Duration::from_secs(2 * 60);

/// How long a row may run without a matching worker process.
pub const WORKER_GRACE: Duration = Duration::from_secs(5 * 60);

pub const REASON_NO_STATE: &str = "No session state found";
pub const REASON_NO_WORKER: &str = "No running worker process after 5 minutes";
pub const REASON_TIMEOUT: &str = "Processing timeout exceeded";

/// What one sweep did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub checked: usize,
    pub reset: usize,
    pub completed: usize,
    /// Rows still processing after the sweep; drives the adaptive interval.
    pub still_processing: usize,
}

impl<S, P, C> Scheduler<S, P, C>
where
    S: SessionRegistry,
    P: ProcessTable,
    C: Clock,
{
    /// One monitoring pass: phantom/stuck detection, then completion sync.
    pub async fn sweep(&self) -> SweepStats {
        let mut stats = SweepStats::default();

        let rows = match self.queue.processing() {
            Ok(rows) => rows,
            Err(e) => {
                warn!("sweep could not list processing rows: {e}");
                return stats;
            }
        };

        for row in &rows {
            stats.checked += 1;
            match self.check_processing_row(row).await {
                Ok(true) => stats.reset += 1,
                Ok(false) => {}
                Err(e) => warn!(project_id = row.id, "sweep check failed: {e}"),
            }
        }

        stats.completed = self.sync_completions().await;

        stats.still_processing = match self.queue.processing() {
            Ok(rows) => rows.len(),
            Err(e) => {
                warn!("sweep could not recount processing rows: {e}");
                0
            }
        };
        debug!(?stats, "sweep finished");
        stats
    }

    /// Phantom/stuck check for one `processing` row. Returns whether the
    /// row was reset.
    async fn check_processing_row(&self, row: &ProjectQueueEntry) -> Result<bool, StorageError> {
        let age = self.row_age(row);

        // Hard ceiling, independent of liveness: a project does not get to
        // process forever just because its session looks healthy.
        if age > self.processing_timeout {
            return self.reset_project(row.id, REASON_TIMEOUT);
        }

        if age < STARTUP_GRACE {
            return Ok(false);
        }

        let snapshot = self.snapshot_for(&row.project_path)?;

        if row.session_name.is_none() && snapshot.is_none() {
            return self.reset_project(row.id, REASON_NO_STATE);
        }

        let session = row
            .resolved_session()
            .map(str::to_string)
            .or_else(|| snapshot.as_ref().and_then(|s| s.session_name.clone()));

        if let Some(session) = session {
            let liveness = validate_liveness(&self.sessions, &session, self.session_grace).await;
            if !liveness.live {
                return self.reset_project(row.id, liveness.reason);
            }
        }

        if age > WORKER_GRACE {
            match self.processes.worker_running(&row.project_path).await {
                Ok(false) => return self.reset_project(row.id, REASON_NO_WORKER),
                Ok(true) => {}
                // cannot confirm; leave the row for the next sweep
                Err(e) => debug!(project_id = row.id, "worker query failed: {e}"),
            }
        }

        Ok(false)
    }

    /// Copy worker-declared completion from snapshots into the queue. This
    /// is the only path by which a row becomes `completed`; the scheduler
    /// never infers success on its own. Reads the snapshot store directly
    /// (not the cache) so a declared result is relayed on the next sweep.
    async fn sync_completions(&self) -> usize {
        let rows = match self.queue.processing() {
            Ok(rows) => rows,
            Err(e) => {
                warn!("completion sync could not list processing rows: {e}");
                return 0;
            }
        };

        let mut synced = 0;
        for row in &rows {
            match self.sync_row_completion(row) {
                Ok(true) => synced += 1,
                Ok(false) => {}
                Err(e) => warn!(project_id = row.id, "completion sync failed: {e}"),
            }
        }
        synced
    }

    fn sync_row_completion(&self, row: &ProjectQueueEntry) -> Result<bool, StorageError> {
        let name = Self::project_name_of(&row.project_path);
        let snapshot = match self.snapshots.store().load(name)? {
            Some(snapshot) => snapshot,
            None => match self.snapshots.store().find_by_project_path(&row.project_path)? {
                Some(snapshot) => snapshot,
                None => return Ok(false),
            },
        };

        let (status, reason) = match snapshot.completion_status {
            CompletionStatus::Pending => return Ok(false),
            CompletionStatus::Completed => (ProjectStatus::Completed, None),
            CompletionStatus::Failed => {
                (ProjectStatus::Failed, snapshot.failure_reason.clone())
            }
        };

        let changed = match status {
            ProjectStatus::Completed => self.queue.complete(&self.clock, row.id)?,
            _ => self.queue.fail(&self.clock, row.id, reason.as_deref())?,
        };
        if !changed {
            return Ok(false);
        }

        info!(project_id = row.id, %status, "relayed worker-declared completion");
        self.snapshots.invalidate(&snapshot.project_name);
        self.events.dispatch(&Event::ProjectComplete { project_id: row.id, status, reason });
        Ok(true)
    }

    fn row_age(&self, row: &ProjectQueueEntry) -> Duration {
        let since = row.started_at.unwrap_or(row.queued_at);
        Duration::from_millis(self.clock.epoch_ms().saturating_sub(since))
    }
}

/// Run sweeps until cancelled. The wait is bounded and cancellable, so
/// shutdown is observed within one interval.
pub async fn run_monitor_loop<S, P, C>(
    scheduler: Arc<Scheduler<S, P, C>>,
    shutdown: CancellationToken,
) where
    S: SessionRegistry,
    P: ProcessTable,
    C: Clock,
{
    info!("monitor loop started");
    loop {
        let stats = scheduler.sweep().await;
        let interval =
            if stats.still_processing > 0 { ACTIVE_INTERVAL } else { scheduler.idle_interval };

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    info!("monitor loop stopped");
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
