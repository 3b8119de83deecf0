// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::CompletionStatus;

fn store() -> (tempfile::TempDir, SnapshotStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SnapshotStore::new(dir.path().join("sessions"));
    (dir, store)
}

fn snapshot(name: &str, path: &str) -> SessionSnapshot {
    let mut snap = SessionSnapshot::new(name, path);
    snap.session_name = Some(format!("{name}-impl-9f3"));
    snap
}

#[test]
fn normalize_lowercases_and_collapses_runs() {
    assert_eq!(normalize_project_name("Demo"), "demo");
    assert_eq!(normalize_project_name("My Cool_Project!!v2"), "my-cool-project-v2");
    assert_eq!(normalize_project_name("--already--"), "already");
}

#[test]
fn store_and_load_round_trip() {
    let (_dir, store) = store();
    let snap = snapshot("demo", "/w/demo");
    store.store(&snap).unwrap();

    let loaded = store.load("demo").unwrap().unwrap();
    assert_eq!(loaded, snap);
    // name normalization makes lookups case-insensitive
    assert_eq!(store.load("Demo").unwrap().unwrap(), snap);
}

#[test]
fn load_missing_is_none() {
    let (_dir, store) = store();
    assert!(store.load("nothing").unwrap().is_none());
}

#[test]
fn malformed_snapshot_is_an_error_on_load() {
    let (_dir, store) = store();
    let path = store.path_for("demo");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{not json").unwrap();
    assert!(matches!(store.load("demo"), Err(StorageError::SnapshotFormat { .. })));
}

#[test]
fn remove_deletes_file_and_empty_parent_dir() {
    let (_dir, store) = store();
    let snap = snapshot("demo", "/w/demo");
    store.store(&snap).unwrap();

    let path = store.path_for("demo");
    let parent = path.parent().unwrap().to_path_buf();
    store.remove("demo").unwrap();
    assert!(!path.exists());
    assert!(!parent.exists());

    // removing again is fine
    store.remove("demo").unwrap();
}

#[test]
fn remove_keeps_nonempty_parent_dir() {
    let (_dir, store) = store();
    store.store(&snapshot("demo", "/w/demo")).unwrap();
    let parent = store.path_for("demo").parent().unwrap().to_path_buf();
    std::fs::write(parent.join("notes.txt"), "keep me").unwrap();

    store.remove("demo").unwrap();
    assert!(parent.exists());
}

#[test]
fn list_skips_malformed_files() {
    let (_dir, store) = store();
    store.store(&snapshot("alpha", "/w/alpha")).unwrap();
    store.store(&snapshot("beta", "/w/beta")).unwrap();

    let bad = store.path_for("gamma");
    std::fs::create_dir_all(bad.parent().unwrap()).unwrap();
    std::fs::write(&bad, "{not json").unwrap();

    let names: Vec<_> = store.list().unwrap().into_iter().map(|s| s.project_name).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
}

#[test]
fn find_by_session_and_project_path() {
    let (_dir, store) = store();
    let mut snap = snapshot("demo", "/w/demo");
    snap.completion_status = CompletionStatus::Completed;
    store.store(&snap).unwrap();

    let by_session = store.find_by_session("demo-impl-9f3").unwrap().unwrap();
    assert_eq!(by_session.project_name, "demo");
    assert!(store.find_by_session("missing").unwrap().is_none());

    let by_path = store.find_by_project_path("/w/demo").unwrap().unwrap();
    assert_eq!(by_path.completion_status, CompletionStatus::Completed);
}
