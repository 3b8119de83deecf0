// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed project queue.
//!
//! All access funnels through one shared connection guarded by a mutex,
//! with a busy timeout so concurrent readers and writers serialize instead
//! of erroring. Each logical operation is one transaction. Terminal
//! transitions (completed xor failed) are guarded in SQL: finalizing a row
//! that is already terminal is a no-op, which is what makes sweeps
//! idempotent.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};

use fm_core::{Clock, ProjectQueueEntry, ProjectStatus};

use crate::StorageError;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS project_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    spec_path TEXT NOT NULL,
    project_path TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'queued',
    queued_at INTEGER NOT NULL,
    started_at INTEGER,
    completed_at INTEGER,
    error_message TEXT,
    batch_id TEXT,
    session_name TEXT,
    orchestrator_session TEXT,
    main_session TEXT
);
CREATE INDEX IF NOT EXISTS idx_project_queue_status ON project_queue(status);

-- Ad hoc scheduled notifications live beside the queue. The scheduler
-- never touches them; external tools own this table.
CREATE TABLE IF NOT EXISTS scheduled_notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    message TEXT NOT NULL,
    deliver_at INTEGER NOT NULL,
    delivered INTEGER NOT NULL DEFAULT 0
);
";

/// The project queue store, cloneable across the monitor and audit paths.
#[derive(Clone)]
pub struct QueueStore {
    conn: Arc<Mutex<Connection>>,
}

impl QueueStore {
    /// Open (or create) the queue database at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StorageError> {
        conn.busy_timeout(Duration::from_secs(5))?;
        // journal_mode returns a row, so go through query_row
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Add a project to the queue as `queued`.
    pub fn enqueue<C: Clock>(
        &self,
        clock: &C,
        spec_path: &str,
        project_path: &str,
        batch_id: Option<&str>,
    ) -> Result<i64, StorageError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO project_queue (spec_path, project_path, status, queued_at, batch_id)
             VALUES (?1, ?2, 'queued', ?3, ?4)",
            params![spec_path, project_path, clock.epoch_ms(), batch_id],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get(&self, id: i64) -> Result<ProjectQueueEntry, StorageError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT * FROM project_queue WHERE id = ?1", params![id], map_row)
            .optional()?
            .ok_or(StorageError::ProjectNotFound(id))?
    }

    /// All rows, oldest first.
    pub fn list(&self) -> Result<Vec<ProjectQueueEntry>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT * FROM project_queue ORDER BY id ASC")?;
        let out = collect(stmt.query_map([], map_row)?);
        out
    }

    /// Rows with the given status, oldest first.
    pub fn list_with_status(
        &self,
        status: ProjectStatus,
    ) -> Result<Vec<ProjectQueueEntry>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT * FROM project_queue WHERE status = ?1 ORDER BY id ASC")?;
        let out = collect(stmt.query_map(params![status.as_str()], map_row)?);
        out
    }

    /// Currently processing rows, the sweep's working set.
    pub fn processing(&self) -> Result<Vec<ProjectQueueEntry>, StorageError> {
        self.list_with_status(ProjectStatus::Processing)
    }

    /// Move a queued row to `processing`, stamping `started_at`.
    pub fn mark_processing<C: Clock>(&self, clock: &C, id: i64) -> Result<bool, StorageError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE project_queue SET status = 'processing', started_at = ?2
             WHERE id = ?1 AND status = 'queued'",
            params![id, clock.epoch_ms()],
        )?;
        Ok(changed > 0)
    }

    /// Record the sessions the external worker attached to a row.
    pub fn assign_sessions(
        &self,
        id: i64,
        session_name: Option<&str>,
        orchestrator_session: Option<&str>,
        main_session: Option<&str>,
    ) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE project_queue
             SET session_name = COALESCE(?2, session_name),
                 orchestrator_session = COALESCE(?3, orchestrator_session),
                 main_session = COALESCE(?4, main_session)
             WHERE id = ?1",
            params![id, session_name, orchestrator_session, main_session],
        )?;
        if changed == 0 {
            return Err(StorageError::ProjectNotFound(id));
        }
        Ok(())
    }

    /// The audit repair write: copy a session name onto a row.
    pub fn update_session_name(&self, id: i64, session_name: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE project_queue SET session_name = ?2 WHERE id = ?1",
            params![id, session_name],
        )?;
        if changed == 0 {
            return Err(StorageError::ProjectNotFound(id));
        }
        Ok(())
    }

    /// Finalize a processing row as `completed`. No-op when already terminal.
    pub fn complete<C: Clock>(&self, clock: &C, id: i64) -> Result<bool, StorageError> {
        self.finalize(clock, id, ProjectStatus::Completed, None)
    }

    /// Finalize a processing row as `failed`, copying the reason (which may
    /// legitimately be absent when relayed from a snapshot). No-op when
    /// already terminal.
    pub fn fail<C: Clock>(
        &self,
        clock: &C,
        id: i64,
        reason: Option<&str>,
    ) -> Result<bool, StorageError> {
        self.finalize(clock, id, ProjectStatus::Failed, reason)
    }

    /// The reset transaction used by the phantom/stuck sweep: identical to
    /// `fail`, named for its caller.
    pub fn reset_to_failed<C: Clock>(
        &self,
        clock: &C,
        id: i64,
        reason: &str,
    ) -> Result<bool, StorageError> {
        self.fail(clock, id, Some(reason))
    }

    fn finalize<C: Clock>(
        &self,
        clock: &C,
        id: i64,
        status: ProjectStatus,
        reason: Option<&str>,
    ) -> Result<bool, StorageError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE project_queue
             SET status = ?2, error_message = ?3, completed_at = ?4
             WHERE id = ?1 AND status = 'processing'",
            params![id, status.as_str(), reason, clock.epoch_ms()],
        )?;
        Ok(changed > 0)
    }

    /// Put a processing row back at the start of its life: `queued`, no
    /// sessions, no error. Used by the audit when a session name cannot be
    /// repaired from any snapshot.
    pub fn requeue(&self, id: i64) -> Result<bool, StorageError> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE project_queue
             SET status = 'queued', started_at = NULL, completed_at = NULL,
                 error_message = NULL, session_name = NULL,
                 orchestrator_session = NULL, main_session = NULL
             WHERE id = ?1 AND status = 'processing'",
            params![id],
        )?;
        Ok(changed > 0)
    }

    /// Row whose `session_name` matches, if any.
    pub fn find_by_session_name(
        &self,
        session_name: &str,
    ) -> Result<Option<ProjectQueueEntry>, StorageError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT * FROM project_queue WHERE session_name = ?1 ORDER BY id DESC LIMIT 1",
            params![session_name],
            map_row,
        )
        .optional()?
        .transpose()
    }

    /// Most recent row for a project path, if any.
    pub fn find_by_project_path(
        &self,
        project_path: &str,
    ) -> Result<Option<ProjectQueueEntry>, StorageError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT * FROM project_queue WHERE project_path = ?1 ORDER BY id DESC LIMIT 1",
            params![project_path],
            map_row,
        )
        .optional()?
        .transpose()
    }
}

type RowResult = Result<ProjectQueueEntry, StorageError>;

fn map_row(row: &Row<'_>) -> rusqlite::Result<RowResult> {
    let status_text: String = row.get("status")?;
    let status = match ProjectStatus::parse(&status_text) {
        Some(s) => s,
        None => return Ok(Err(StorageError::InvalidStatus(status_text))),
    };
    Ok(Ok(ProjectQueueEntry {
        id: row.get("id")?,
        spec_path: row.get("spec_path")?,
        project_path: row.get("project_path")?,
        status,
        queued_at: row.get::<_, i64>("queued_at")? as u64,
        started_at: row.get::<_, Option<i64>>("started_at")?.map(|v| v as u64),
        completed_at: row.get::<_, Option<i64>>("completed_at")?.map(|v| v as u64),
        error_message: row.get("error_message")?,
        batch_id: row.get("batch_id")?,
        session_name: row.get("session_name")?,
        orchestrator_session: row.get("orchestrator_session")?,
        main_session: row.get("main_session")?,
    }))
}

fn collect(
    rows: impl Iterator<Item = rusqlite::Result<RowResult>>,
) -> Result<Vec<ProjectQueueEntry>, StorageError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
