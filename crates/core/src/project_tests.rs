// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn entry() -> ProjectQueueEntry {
    ProjectQueueEntry {
        id: 1,
        spec_path: "/tmp/spec.md".to_string(),
        project_path: "/tmp/demo".to_string(),
        status: ProjectStatus::Queued,
        queued_at: 1_000,
        started_at: None,
        completed_at: None,
        error_message: None,
        batch_id: None,
        session_name: None,
        orchestrator_session: None,
        main_session: None,
    }
}

#[test]
fn status_round_trips_through_str() {
    for status in [
        ProjectStatus::Queued,
        ProjectStatus::Processing,
        ProjectStatus::Completed,
        ProjectStatus::Failed,
    ] {
        assert_eq!(ProjectStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(ProjectStatus::parse("bogus"), None);
}

#[test]
fn terminal_statuses() {
    assert!(!ProjectStatus::Queued.is_terminal());
    assert!(!ProjectStatus::Processing.is_terminal());
    assert!(ProjectStatus::Completed.is_terminal());
    assert!(ProjectStatus::Failed.is_terminal());
}

#[test]
fn resolved_session_prefers_orchestrator() {
    let mut e = entry();
    e.session_name = Some("worker".to_string());
    e.main_session = Some("main".to_string());
    e.orchestrator_session = Some("orch".to_string());
    assert_eq!(e.resolved_session(), Some("orch"));

    e.orchestrator_session = None;
    assert_eq!(e.resolved_session(), Some("main"));

    e.main_session = None;
    assert_eq!(e.resolved_session(), Some("worker"));

    e.session_name = None;
    assert_eq!(e.resolved_session(), None);
}

#[test]
fn timestamps_consistent_tracks_terminal_status() {
    let mut e = entry();
    assert!(e.timestamps_consistent());

    e.status = ProjectStatus::Failed;
    assert!(!e.timestamps_consistent());

    e.completed_at = Some(2_000);
    assert!(e.timestamps_consistent());
}
