// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-through snapshot cache.
//!
//! Snapshot files are re-read by every sweep; the cache bounds that churn
//! with a per-entry TTL. Negative results (no file) are cached too. Any
//! corrective write must invalidate its entry so the next read sees the
//! mutation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use fm_core::{Clock, SessionSnapshot};

use crate::{normalize_project_name, SnapshotStore, StorageError};

/// Time cached snapshot reads stay fresh.
pub const SNAPSHOT_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    snapshot: Option<SessionSnapshot>,
    read_at: Instant,
}

/// TTL cache wrapping a [`SnapshotStore`].
pub struct SnapshotCache<C: Clock> {
    store: SnapshotStore,
    clock: C,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl<C: Clock> SnapshotCache<C> {
    pub fn new(store: SnapshotStore, clock: C) -> Self {
        Self::with_ttl(store, clock, SNAPSHOT_TTL)
    }

    pub fn with_ttl(store: SnapshotStore, clock: C, ttl: Duration) -> Self {
        Self { store, clock, ttl, entries: Mutex::new(HashMap::new()) }
    }

    /// The wrapped store, for writes (which must invalidate afterwards).
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Load a snapshot, hitting disk only when the cached entry is missing
    /// or older than the TTL.
    pub fn load(&self, project_name: &str) -> Result<Option<SessionSnapshot>, StorageError> {
        let key = normalize_project_name(project_name);
        let now = self.clock.now();

        {
            let entries = self.entries.lock();
            if let Some(entry) = entries.get(&key) {
                if now.duration_since(entry.read_at) < self.ttl {
                    return Ok(entry.snapshot.clone());
                }
            }
        }

        let snapshot = self.store.load(project_name)?;
        self.entries
            .lock()
            .insert(key, CacheEntry { snapshot: snapshot.clone(), read_at: now });
        Ok(snapshot)
    }

    /// Drop one project's cached entry.
    pub fn invalidate(&self, project_name: &str) {
        self.entries.lock().remove(&normalize_project_name(project_name));
    }

    /// Drop every cached entry.
    pub fn invalidate_all(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
