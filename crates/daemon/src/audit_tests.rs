// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::adapters::fake::{FakeProcessTable, FakeSessions};
use crate::config::Config;
use fm_core::FakeClock;
use fm_storage::{QueueStore, SnapshotCache, SnapshotStore};
use std::time::Duration;

struct Harness {
    scheduler: Scheduler<FakeSessions, FakeProcessTable, FakeClock>,
    clock: FakeClock,
    _dir: tempfile::TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let config = Config {
        state_dir: dir.path().to_path_buf(),
        lock_path: dir.path().join("daemon.lock"),
        queue_path: dir.path().join("queue.db"),
        sessions_path: dir.path().join("sessions"),
        idle_interval: Duration::from_secs(60),
        processing_timeout: Duration::from_secs(12 * 3600),
    };
    let queue = QueueStore::open_in_memory().unwrap();
    let store = SnapshotStore::new(&config.sessions_path);
    let cache = SnapshotCache::with_ttl(store, clock.clone(), Duration::ZERO);
    let scheduler = Scheduler::new(
        &config,
        queue,
        cache,
        FakeSessions::new(),
        FakeProcessTable::new(),
        clock.clone(),
    );
    Harness { scheduler, clock, _dir: dir }
}

impl Harness {
    fn processing_row(&self, project_path: &str, session: Option<&str>) -> i64 {
        let id = self
            .scheduler
            .queue
            .enqueue(&self.clock, "/specs/spec.md", project_path, None)
            .unwrap();
        self.scheduler.queue.mark_processing(&self.clock, id).unwrap();
        if let Some(session) = session {
            self.scheduler.queue.assign_sessions(id, Some(session), None, None).unwrap();
        }
        id
    }

    fn write_snapshot(&self, project_name: &str, project_path: &str, session: &str) {
        let mut snapshot = SessionSnapshot::new(project_name, project_path);
        snapshot.session_name = Some(session.to_string());
        self.scheduler.snapshots.store().store(&snapshot).unwrap();
    }
}

#[tokio::test]
async fn consistent_state_is_clean() {
    let h = harness();
    h.processing_row("/w/demo", Some("demo-1"));
    h.write_snapshot("demo", "/w/demo", "demo-1");
    h.scheduler.sessions.insert_healthy("demo-1");

    let report = h.scheduler.audit(false).await.unwrap();
    assert!(report.is_clean(), "unexpected mismatches: {:?}", report.mismatches);
    assert_eq!(report.repaired, 0);
}

#[tokio::test]
async fn orphaned_snapshot_is_reported_and_cleaned_up() {
    // Scenario: snapshot for "demo" names a session no row references
    let h = harness();
    h.write_snapshot("demo", "/w/demo", "demo-impl-9f3");
    let path = h.scheduler.snapshots.store().path_for("demo");
    let parent = path.parent().unwrap().to_path_buf();

    let report = h.scheduler.audit(false).await.unwrap();
    assert_eq!(
        report.mismatches,
        vec![StateMismatch::OrphanedJson {
            project_name: "demo".to_string(),
            session_name: "demo-impl-9f3".to_string(),
        }]
    );
    assert_eq!(report.mismatches[0].severity(), MismatchSeverity::Warning);
    assert_eq!(report.repaired, 1);
    assert!(!path.exists());
    assert!(!parent.exists());

    assert!(h.scheduler.audit(false).await.unwrap().is_clean());
}

#[tokio::test]
async fn missing_session_name_is_repaired_from_snapshot() {
    // Scenario: processing row without a session name, snapshot for the
    // same project path names "alpha-7d2"
    let h = harness();
    let id = h.processing_row("/w/alpha", None);
    h.write_snapshot("alpha", "/w/alpha", "alpha-7d2");
    h.scheduler.sessions.insert_healthy("alpha-7d2");

    let report = h.scheduler.audit(false).await.unwrap();
    assert_eq!(
        report.mismatches,
        vec![StateMismatch::MissingSessionName {
            project_id: id,
            project_path: "/w/alpha".to_string(),
        }]
    );
    assert_eq!(report.mismatches[0].severity(), MismatchSeverity::Critical);
    assert_eq!(report.repaired, 1);

    let entry = h.scheduler.queue.get(id).unwrap();
    assert_eq!(entry.session_name.as_deref(), Some("alpha-7d2"));
    assert_eq!(entry.status, ProjectStatus::Processing);

    assert!(h.scheduler.audit(false).await.unwrap().is_clean());
}

#[tokio::test]
async fn missing_session_name_without_snapshot_requeues() {
    let h = harness();
    let id = h.processing_row("/w/alpha", None);

    let report = h.scheduler.audit(false).await.unwrap();
    assert_eq!(report.repaired, 1);

    let entry = h.scheduler.queue.get(id).unwrap();
    assert_eq!(entry.status, ProjectStatus::Queued);
    assert!(entry.started_at.is_none());

    assert!(h.scheduler.audit(false).await.unwrap().is_clean());
}

#[tokio::test]
async fn dead_session_row_is_reset_to_failed() {
    let h = harness();
    let id = h.processing_row("/w/demo", Some("gone-1"));
    // registry knows other sessions, not this one
    h.scheduler.sessions.insert_healthy("unrelated");

    let report = h.scheduler.audit(false).await.unwrap();
    assert_eq!(
        report.mismatches,
        vec![StateMismatch::DeadTmuxSession { project_id: id, session_name: "gone-1".to_string() }]
    );
    assert_eq!(report.repaired, 1);

    let entry = h.scheduler.queue.get(id).unwrap();
    assert_eq!(entry.status, ProjectStatus::Failed);
    assert_eq!(entry.error_message.as_deref(), Some(crate::liveness::REASON_NO_SESSION));
    assert!(entry.timestamps_consistent());

    assert!(h.scheduler.audit(false).await.unwrap().is_clean());
}

#[tokio::test]
async fn stale_snapshot_for_terminal_row_is_cleaned_up() {
    let h = harness();
    let id = h.processing_row("/w/demo", Some("demo-1"));
    h.write_snapshot("demo", "/w/demo", "demo-1");
    h.scheduler.queue.complete(&h.clock, id).unwrap();

    let report = h.scheduler.audit(false).await.unwrap();
    assert_eq!(
        report.mismatches,
        vec![StateMismatch::StaleJsonState {
            project_id: id,
            project_name: "demo".to_string(),
            status: ProjectStatus::Completed,
        }]
    );
    assert_eq!(report.mismatches[0].severity(), MismatchSeverity::Info);
    assert!(h.scheduler.snapshots.store().load("demo").unwrap().is_none());

    assert!(h.scheduler.audit(false).await.unwrap().is_clean());
}

#[tokio::test]
async fn diverging_project_paths_are_reported_but_not_mutated() {
    let h = harness();
    let id = h.processing_row("/w/a", Some("shared-1"));
    h.write_snapshot("b", "/w/b", "shared-1");
    h.scheduler.sessions.insert_healthy("shared-1");

    let report = h.scheduler.audit(false).await.unwrap();
    assert_eq!(
        report.mismatches,
        vec![StateMismatch::SessionNameMismatch {
            project_id: id,
            session_name: "shared-1".to_string(),
            queue_project_path: "/w/a".to_string(),
            snapshot_project_path: "/w/b".to_string(),
        }]
    );
    // verification only: nothing to repair
    assert_eq!(report.repaired, 0);
    assert_eq!(h.scheduler.queue.get(id).unwrap().status, ProjectStatus::Processing);
    assert!(h.scheduler.snapshots.store().load("b").unwrap().is_some());
}

#[tokio::test]
async fn dry_run_reports_without_mutating_either_store() {
    let h = harness();
    let id = h.processing_row("/w/alpha", None);
    h.write_snapshot("demo", "/w/demo", "demo-impl-9f3");

    let report = h.scheduler.audit(true).await.unwrap();
    assert_eq!(report.mismatches.len(), 2);
    assert_eq!(report.repaired, 0);
    assert!(report.dry_run);

    // both stores untouched
    assert_eq!(h.scheduler.queue.get(id).unwrap().status, ProjectStatus::Processing);
    assert!(h.scheduler.snapshots.store().load("demo").unwrap().is_some());

    // applying resolves exactly what was reported; a further pass is clean
    let applied = h.scheduler.audit(false).await.unwrap();
    assert_eq!(applied.mismatches, report.mismatches);
    assert_eq!(applied.repaired, 2);
    assert!(h.scheduler.audit(true).await.unwrap().is_clean());
}

#[tokio::test]
async fn live_set_query_failure_skips_session_findings() {
    let h = harness();
    h.processing_row("/w/demo", Some("demo-1"));
    h.scheduler.sessions.set_failing(true);

    let report = h.scheduler.audit(false).await.unwrap();
    assert!(report.is_clean(), "unexpected mismatches: {:?}", report.mismatches);
}

#[tokio::test]
async fn report_groups_by_severity() {
    let h = harness();
    h.processing_row("/w/alpha", None);
    h.write_snapshot("demo", "/w/demo", "demo-impl-9f3");

    let report = h.scheduler.audit(true).await.unwrap();
    let groups = report.by_severity();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].0, MismatchSeverity::Critical);
    assert_eq!(groups[1].0, MismatchSeverity::Warning);

    let rendered = report.to_string();
    assert!(rendered.contains("[critical]"));
    assert!(rendered.contains("repair_session_name_from_json_or_reset_to_queued"));
}
