// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-storage: Persistence for the Foreman scheduler.
//!
//! Two deliberately separate stores: the SQLite project queue (queryable
//! status, one transaction per logical operation) and per-project JSON
//! snapshot files (rich nested agent state, owned by the external worker).
//! Cross-store writes happen only in the daemon's reset and audit-repair
//! paths, never here.

mod cache;
mod error;
mod queue;
mod snapshot;

pub use cache::SnapshotCache;
pub use error::StorageError;
pub use queue::QueueStore;
pub use snapshot::{normalize_project_name, SnapshotStore};
