// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-daemon: The Foreman scheduler daemon.
//!
//! One instance per host (enforced by a heartbeat lock file) watches the
//! project queue: a monitoring loop detects phantom and stuck projects and
//! relays worker-declared completion into the queue; an on-demand audit
//! cross-checks the queue, the snapshot store, and the live-session set
//! and repairs what it safely can.

pub mod adapters;
pub mod audit;
pub mod config;
pub mod lifecycle;
pub mod liveness;
pub mod lock;
pub mod monitor;
pub mod service;

pub use audit::AuditReport;
pub use config::Config;
pub use lifecycle::{Daemon, LifecycleError};
pub use liveness::Liveness;
pub use lock::{ProcessLock, ProcessLockRecord};
pub use service::Scheduler;
