// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, run loop, shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use fm_core::SystemClock;
use fm_storage::{QueueStore, SnapshotCache, SnapshotStore, StorageError};

use crate::adapters::{PsProcessTable, TmuxRegistry};
use crate::config::Config;
use crate::lock::{run_heartbeat, ProcessLock, ProcessLockRecord};
use crate::monitor::run_monitor_loop;
use crate::service::Scheduler;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Another instance holds the lock{}", held_by(.0))]
    LockHeld(Option<ProcessLockRecord>),

    #[error("Failed to encode lock record: {0}")]
    LockRecord(#[source] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn held_by(record: &Option<ProcessLockRecord>) -> String {
    match record {
        Some(r) => format!(" (pid {} on {}, heartbeat {})", r.pid, r.hostname, r.timestamp),
        None => String::new(),
    }
}

/// Scheduler with the production adapter set.
pub type DaemonScheduler = Scheduler<TmuxRegistry, PsProcessTable, SystemClock>;

/// A started daemon: the scheduler plus the held instance lock.
pub struct Daemon {
    pub scheduler: Arc<DaemonScheduler>,
    /// Root state directory, kept for log context.
    pub state_dir: PathBuf,
    lock: Arc<Mutex<Option<ProcessLock>>>,
    shutdown: CancellationToken,
}

impl Daemon {
    /// Create the state directories, acquire the instance lock, open both
    /// stores, and assemble the scheduler. Fails fast when another daemon
    /// holds the lock; the error carries the holder's record.
    pub fn startup(config: &Config) -> Result<Self, LifecycleError> {
        std::fs::create_dir_all(&config.state_dir)?;
        std::fs::create_dir_all(&config.sessions_path)?;

        // Lock before opening the queue so two daemons never share a
        // connection to the same database.
        let lock = ProcessLock::acquire(&config.lock_path)?;

        let queue = QueueStore::open(&config.queue_path)?;
        let snapshots =
            SnapshotCache::new(SnapshotStore::new(&config.sessions_path), SystemClock);
        let scheduler = Scheduler::new(
            config,
            queue,
            snapshots,
            TmuxRegistry::new(),
            PsProcessTable::default(),
            SystemClock,
        );

        info!(state_dir = %config.state_dir.display(), "daemon started");
        Ok(Self {
            scheduler: Arc::new(scheduler),
            state_dir: config.state_dir.clone(),
            lock: Arc::new(Mutex::new(Some(lock))),
            shutdown: CancellationToken::new(),
        })
    }

    /// Token that stops the monitor and heartbeat tasks when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the monitor sweep and lock heartbeat until the shutdown token is
    /// cancelled, then release the lock.
    pub async fn run(self) {
        let monitor = tokio::spawn(run_monitor_loop(
            Arc::clone(&self.scheduler),
            self.shutdown.clone(),
        ));
        let heartbeat = tokio::spawn(run_heartbeat(
            Arc::clone(&self.lock),
            self.shutdown.clone(),
        ));

        // Both tasks exit on cancellation; a panic in either is fatal to
        // the process anyway, so join errors are only logged.
        if let Err(e) = monitor.await {
            tracing::error!("monitor task failed: {e}");
        }
        if let Err(e) = heartbeat.await {
            tracing::error!("heartbeat task failed: {e}");
        }

        if let Some(lock) = self.lock.lock().take() {
            lock.release();
        }
        info!("daemon stopped");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
