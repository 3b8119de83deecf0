// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-core: Domain types for the Foreman scheduler.
//!
//! Shared vocabulary between the storage layer and the daemon: project
//! queue entries, session snapshots, the mismatch taxonomy produced by the
//! state audit, the in-process event bus, and the clock abstraction.

pub mod clock;
pub mod event;
pub mod mismatch;
pub mod project;
pub mod snapshot;

pub use clock::{Clock, FakeClock, SystemClock};
pub use event::{Event, EventBus};
pub use mismatch::{MismatchSeverity, RecommendedAction, StateMismatch};
pub use project::{ProjectQueueEntry, ProjectStatus};
pub use snapshot::{AgentState, CompletionStatus, SessionSnapshot};
