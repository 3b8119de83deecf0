// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tmux-backed session registry.
//!
//! Every query shells out to tmux with a short timeout. A missing tmux
//! server reads as "no sessions", not an error.

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;

use super::{QueryError, SessionRegistry};

/// Upper bound for a single external query.
pub(crate) const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Session registry backed by the local tmux server.
#[derive(Debug, Clone, Default)]
pub struct TmuxRegistry;

impl TmuxRegistry {
    pub fn new() -> Self {
        Self
    }

    async fn tmux(&self, args: &[&str]) -> Result<std::process::Output, QueryError> {
        run_with_timeout("tmux", args).await
    }

    /// Pids of panes that are not dead, for the live-child check.
    async fn pane_pids(&self, name: &str) -> Result<Vec<u32>, QueryError> {
        let output = self
            .tmux(&["list-panes", "-s", "-t", name, "-F", "#{pane_pid} #{pane_dead}"])
            .await?;
        if !output.status.success() {
            return Err(QueryError::Command(stderr_line(&output)));
        }
        let mut pids = Vec::new();
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            let mut parts = line.split_whitespace();
            let pid = parts.next().and_then(|p| p.parse::<u32>().ok());
            let dead = parts.next() == Some("1");
            if let (Some(pid), false) = (pid, dead) {
                pids.push(pid);
            }
        }
        Ok(pids)
    }

    /// Read a session-scoped epoch-seconds format variable.
    async fn session_epoch_var(&self, name: &str, var: &str) -> Result<u64, QueryError> {
        let fmt = format!("#{{{var}}}");
        let output = self.tmux(&["display-message", "-p", "-t", name, "-F", &fmt]).await?;
        if !output.status.success() {
            return Err(QueryError::Command(stderr_line(&output)));
        }
        String::from_utf8_lossy(&output.stdout)
            .trim()
            .parse::<u64>()
            .map_err(|e| QueryError::Command(format!("bad {var} value: {e}")))
    }
}

#[async_trait]
impl SessionRegistry for TmuxRegistry {
    async fn session_exists(&self, name: &str) -> Result<bool, QueryError> {
        // `=` prefix forces an exact match instead of tmux prefix matching
        let target = format!("={name}");
        let output = self.tmux(&["has-session", "-t", &target]).await?;
        Ok(output.status.success())
    }

    async fn has_dead_panes(&self, name: &str) -> Result<bool, QueryError> {
        let output = self.tmux(&["list-panes", "-s", "-t", name, "-F", "#{pane_dead}"]).await?;
        if !output.status.success() {
            return Err(QueryError::Command(stderr_line(&output)));
        }
        Ok(String::from_utf8_lossy(&output.stdout).lines().any(|l| l.trim() == "1"))
    }

    async fn idle_time(&self, name: &str) -> Result<Duration, QueryError> {
        let activity = self.session_epoch_var(name, "session_activity").await?;
        Ok(epoch_secs_since(activity))
    }

    async fn session_age(&self, name: &str) -> Result<Duration, QueryError> {
        let created = self.session_epoch_var(name, "session_created").await?;
        Ok(epoch_secs_since(created))
    }

    async fn has_live_child(&self, name: &str) -> Result<bool, QueryError> {
        let pids = self.pane_pids(name).await?;
        if pids.is_empty() {
            return Ok(false);
        }
        let list = pids.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(",");
        let output = run_with_timeout("ps", &["-o", "pid=", "-p", &list]).await?;
        Ok(output.status.success()
            && String::from_utf8_lossy(&output.stdout).lines().any(|l| !l.trim().is_empty()))
    }

    async fn live_sessions(&self) -> Result<HashSet<String>, QueryError> {
        let output = self.tmux(&["list-sessions", "-F", "#{session_name}"]).await?;
        if !output.status.success() {
            // no server running means no sessions
            return Ok(HashSet::new());
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect())
    }
}

pub(crate) async fn run_with_timeout(
    program: &str,
    args: &[&str],
) -> Result<std::process::Output, QueryError> {
    let fut = tokio::process::Command::new(program).args(args).output();
    match tokio::time::timeout(QUERY_TIMEOUT, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(QueryError::Timeout(QUERY_TIMEOUT)),
    }
}

fn stderr_line(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).lines().next().unwrap_or("unknown error").to_string()
}

fn epoch_secs_since(epoch_secs: u64) -> Duration {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    Duration::from_secs(now.saturating_sub(epoch_secs))
}
