// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory adapters for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ProcessTable, QueryError, SessionRegistry};

/// Scripted state of one fake session.
#[derive(Debug, Clone)]
pub struct FakeSession {
    pub dead_panes: bool,
    pub idle: Duration,
    pub age: Duration,
    pub live_child: bool,
}

impl Default for FakeSession {
    fn default() -> Self {
        // a healthy, established session
        Self {
            dead_panes: false,
            idle: Duration::from_secs(10),
            age: Duration::from_secs(3600),
            live_child: true,
        }
    }
}

/// Fake session registry with scripted sessions and optional failure mode.
#[derive(Clone, Default)]
pub struct FakeSessions {
    inner: Arc<Mutex<FakeSessionsInner>>,
}

#[derive(Default)]
struct FakeSessionsInner {
    sessions: HashMap<String, FakeSession>,
    failing: bool,
}

impl FakeSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, name: &str, session: FakeSession) {
        self.inner.lock().sessions.insert(name.to_string(), session);
    }

    pub fn insert_healthy(&self, name: &str) {
        self.insert(name, FakeSession::default());
    }

    pub fn remove(&self, name: &str) {
        self.inner.lock().sessions.remove(name);
    }

    /// Make every query fail, simulating an unreachable multiplexer.
    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().failing = failing;
    }

    fn get(&self, name: &str) -> Result<Option<FakeSession>, QueryError> {
        let inner = self.inner.lock();
        if inner.failing {
            return Err(QueryError::Command("registry unavailable".to_string()));
        }
        Ok(inner.sessions.get(name).cloned())
    }

    fn require(&self, name: &str) -> Result<FakeSession, QueryError> {
        self.get(name)?
            .ok_or_else(|| QueryError::Command(format!("no such session: {name}")))
    }
}

#[async_trait]
impl SessionRegistry for FakeSessions {
    async fn session_exists(&self, name: &str) -> Result<bool, QueryError> {
        Ok(self.get(name)?.is_some())
    }

    async fn has_dead_panes(&self, name: &str) -> Result<bool, QueryError> {
        Ok(self.require(name)?.dead_panes)
    }

    async fn idle_time(&self, name: &str) -> Result<Duration, QueryError> {
        Ok(self.require(name)?.idle)
    }

    async fn session_age(&self, name: &str) -> Result<Duration, QueryError> {
        Ok(self.require(name)?.age)
    }

    async fn has_live_child(&self, name: &str) -> Result<bool, QueryError> {
        Ok(self.require(name)?.live_child)
    }

    async fn live_sessions(&self) -> Result<HashSet<String>, QueryError> {
        let inner = self.inner.lock();
        if inner.failing {
            return Err(QueryError::Command("registry unavailable".to_string()));
        }
        Ok(inner.sessions.keys().cloned().collect())
    }
}

/// Fake process table keyed by project path.
#[derive(Clone, Default)]
pub struct FakeProcessTable {
    running: Arc<Mutex<HashSet<String>>>,
}

impl FakeProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_running(&self, project_path: &str, running: bool) {
        let mut set = self.running.lock();
        if running {
            set.insert(project_path.to_string());
        } else {
            set.remove(project_path);
        }
    }
}

#[async_trait]
impl ProcessTable for FakeProcessTable {
    async fn worker_running(&self, project_path: &str) -> Result<bool, QueryError> {
        Ok(self.running.lock().contains(project_path))
    }
}
