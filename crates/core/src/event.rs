// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process scheduler events.
//!
//! Dispatch is synchronous: subscribers run on the dispatching thread, in
//! subscription order. A slow subscriber must hand off to its own thread;
//! the bus does no queueing and has no wire format.

use crate::project::ProjectStatus;
use parking_lot::Mutex;
use std::sync::Arc;

/// Events emitted by the scheduler core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A queue row reached a terminal status (completed or failed).
    ProjectComplete { project_id: i64, status: ProjectStatus, reason: Option<String> },
    /// A sub-task within a running project finished.
    TaskComplete { project_id: i64 },
}

type Subscriber = Box<dyn Fn(&Event) + Send + Sync>;

/// Synchronous in-process event bus.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Subscriber>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber invoked synchronously on every dispatch.
    pub fn subscribe<F>(&self, f: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribers.lock().push(Box::new(f));
    }

    /// Deliver an event to every subscriber on the current thread.
    pub fn dispatch(&self, event: &Event) {
        for subscriber in self.subscribers.lock().iter() {
            subscriber(event);
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
