// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration and centralized environment variable access.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: FOREMAN_STATE_DIR > XDG_STATE_HOME/foreman >
/// ~/.local/state/foreman
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("FOREMAN_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("foreman"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/foreman"))
}

/// Monitor interval while no project is processing (default 60s,
/// `FOREMAN_IDLE_INTERVAL_SECS`).
pub fn idle_interval() -> Duration {
    std::env::var("FOREMAN_IDLE_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(60))
}

/// Hard ceiling for a `processing` row regardless of liveness (default 12h,
/// `FOREMAN_PROCESSING_TIMEOUT_HOURS`).
pub fn processing_timeout() -> Duration {
    std::env::var("FOREMAN_PROCESSING_TIMEOUT_HOURS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(|h| Duration::from_secs(h * 3600))
        .unwrap_or(Duration::from_secs(12 * 3600))
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/foreman)
    pub state_dir: PathBuf,
    /// Path to the heartbeat lock file
    pub lock_path: PathBuf,
    /// Path to the SQLite queue database
    pub queue_path: PathBuf,
    /// Directory of per-project snapshot files
    pub sessions_path: PathBuf,
    /// Monitor interval while the queue is idle
    pub idle_interval: Duration,
    /// Stuck ceiling for processing rows
    pub processing_timeout: Duration,
}

impl Config {
    /// Load configuration from the environment with fixed paths under the
    /// state directory. One daemon serves all projects for a user.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        Ok(Self {
            lock_path: state_dir.join("daemon.lock"),
            queue_path: state_dir.join("queue.db"),
            sessions_path: state_dir.join("sessions"),
            idle_interval: idle_interval(),
            processing_timeout: processing_timeout(),
            state_dir,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
