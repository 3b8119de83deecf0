// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-project snapshot files.
//!
//! One JSON file per project at `<root>/<normalized-name>/state.json`.
//! The external worker owns these files; the scheduler reads them and only
//! writes in the two corrective paths (mirroring a reset, audit cleanup).
//! Writes are atomic (temp file + rename) so a concurrent reader never
//! sees a torn snapshot.

use std::fs;
use std::path::{Path, PathBuf};

use fm_core::SessionSnapshot;
use tracing::warn;

use crate::StorageError;

/// Normalize a project name into a filesystem-safe directory name:
/// lowercase, any run of non-alphanumerics collapsed to a single `-`.
pub fn normalize_project_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

/// Store of per-project snapshot files under one root directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic path for a project's snapshot file.
    pub fn path_for(&self, project_name: &str) -> PathBuf {
        self.root.join(normalize_project_name(project_name)).join("state.json")
    }

    /// Load a project's snapshot, `None` when no file exists.
    pub fn load(&self, project_name: &str) -> Result<Option<SessionSnapshot>, StorageError> {
        let path = self.path_for(project_name);
        self.load_path(&path)
    }

    fn load_path(&self, path: &Path) -> Result<Option<SessionSnapshot>, StorageError> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::SnapshotIo { path: path.to_path_buf(), source: e }),
        };
        let snapshot = serde_json::from_str(&data)
            .map_err(|e| StorageError::SnapshotFormat { path: path.to_path_buf(), source: e })?;
        Ok(Some(snapshot))
    }

    /// Write a project's snapshot atomically.
    pub fn store(&self, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let path = self.path_for(&snapshot.project_name);
        let io = |e| StorageError::SnapshotIo { path: path.clone(), source: e };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(snapshot)
            .map_err(|e| StorageError::SnapshotFormat { path: path.clone(), source: e })?;
        fs::write(&tmp, data).map_err(io)?;
        fs::rename(&tmp, &path).map_err(io)?;
        Ok(())
    }

    /// Delete a project's snapshot file and its parent directory when that
    /// leaves the directory empty. Missing files are fine.
    pub fn remove(&self, project_name: &str) -> Result<(), StorageError> {
        let path = self.path_for(project_name);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StorageError::SnapshotIo { path, source: e }),
        }
        if let Some(parent) = path.parent() {
            // Fails while non-empty, which is exactly the behavior we want
            let _ = fs::remove_dir(parent);
        }
        Ok(())
    }

    /// All readable snapshots under the root. Unreadable or malformed files
    /// are logged and skipped so one bad file cannot hide the rest.
    pub fn list(&self) -> Result<Vec<SessionSnapshot>, StorageError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::SnapshotIo { path: self.root.clone(), source: e }),
        };

        let mut snapshots = Vec::new();
        for entry in entries.flatten() {
            let state_path = entry.path().join("state.json");
            match self.load_path(&state_path) {
                Ok(Some(snapshot)) => snapshots.push(snapshot),
                Ok(None) => {}
                Err(e) => warn!(path = %state_path.display(), "skipping unreadable snapshot: {e}"),
            }
        }
        snapshots.sort_by(|a, b| a.project_name.cmp(&b.project_name));
        Ok(snapshots)
    }

    /// Snapshot whose `session_name` matches, if any.
    pub fn find_by_session(
        &self,
        session_name: &str,
    ) -> Result<Option<SessionSnapshot>, StorageError> {
        Ok(self
            .list()?
            .into_iter()
            .find(|s| s.session_name.as_deref() == Some(session_name)))
    }

    /// Snapshot whose `project_path` matches, if any.
    pub fn find_by_project_path(
        &self,
        project_path: &str,
    ) -> Result<Option<SessionSnapshot>, StorageError> {
        Ok(self.list()?.into_iter().find(|s| s.project_path == project_path))
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
