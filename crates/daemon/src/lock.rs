// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-instance lock file with heartbeat.
//!
//! The lock file holds a JSON `{pid, hostname, timestamp}` record under an
//! OS advisory lock. External monitors read the record without acquiring
//! the lock and judge staleness by timestamp age; a crashed daemon leaves
//! a stale file that is detectable only by age, not by existence. There is
//! no waiting on contention: the loser reads the holder's record and the
//! process exits.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fs2::FileExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::lifecycle::LifecycleError;

/// How often the holder rewrites its record.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Identity of the process holding (or last holding) the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessLockRecord {
    pub pid: u32,
    pub hostname: String,
    /// RFC3339; external monitors display heartbeat age from this.
    pub timestamp: String,
}

impl ProcessLockRecord {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            hostname: hostname::get()
                .ok()
                .and_then(|h| h.into_string().ok())
                .unwrap_or_else(|| "unknown".to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// An exclusively held lock file.
#[derive(Debug)]
pub struct ProcessLock {
    file: File,
    path: PathBuf,
}

impl ProcessLock {
    /// Acquire the lock or fail immediately with the current holder's
    /// record. Never waits: single-instance-per-host is enforced at
    /// process granularity and contention is fatal to the caller.
    pub fn acquire(path: &Path) -> Result<Self, LifecycleError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Open without truncating so a failed attempt cannot wipe the
        // running daemon's record.
        let file = OpenOptions::new().read(true).write(true).create(true).truncate(false).open(path)?;
        if file.try_lock_exclusive().is_err() {
            return Err(LifecycleError::LockHeld(read_record(path)?));
        }

        let mut lock = Self { file, path: path.to_path_buf() };
        lock.write_record()?;
        Ok(lock)
    }

    /// Rewrite the holder record; called every heartbeat interval.
    pub fn refresh(&mut self) -> Result<(), LifecycleError> {
        self.write_record()
    }

    fn write_record(&mut self) -> Result<(), LifecycleError> {
        let record = ProcessLockRecord::current();
        let data = serde_json::to_string(&record).map_err(LifecycleError::LockRecord)?;
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(data.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    /// Unlock and delete the file. Best-effort: registered on the
    /// shutdown path, not guaranteed on a crash.
    pub fn release(self) {
        if let Err(e) = fs2::FileExt::unlock(&self.file) {
            warn!("failed to unlock lock file: {e}");
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("failed to remove lock file: {e}");
        }
    }
}

/// Read the holder record without acquiring the lock. `None` when the
/// file is empty or unparseable (a holder that died mid-write).
pub fn read_record(path: &Path) -> Result<Option<ProcessLockRecord>, LifecycleError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut data = String::new();
    file.read_to_string(&mut data)?;
    Ok(serde_json::from_str(&data).ok())
}

/// Rewrite the lock record every [`HEARTBEAT_INTERVAL`] until cancelled,
/// so external tools can tell a live holder from a stale lock.
pub async fn run_heartbeat(lock: Arc<Mutex<Option<ProcessLock>>>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(HEARTBEAT_INTERVAL) => {}
        }
        let mut guard = lock.lock();
        match guard.as_mut() {
            Some(lock) => {
                if let Err(e) = lock.refresh() {
                    warn!("heartbeat failed to refresh lock record: {e}");
                } else {
                    debug!("heartbeat refreshed lock record");
                }
            }
            // released during shutdown
            None => break,
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
