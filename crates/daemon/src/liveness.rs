// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composite session liveness check.
//!
//! A single signal is not enough: a session can exist with an orphaned,
//! non-functioning shell. Liveness is an ordered conjunction of
//! independent failure-mode detectors (abrupt kill, hang, idle zombie,
//! lost child process), short-circuiting on the first failure. The reason
//! string travels verbatim into `error_message` / `failure_reason`, so the
//! wording here is part of the contract.

use std::time::Duration;

use crate::adapters::SessionRegistry;

/// Default post-creation window during which idle checks are suppressed.
pub const SESSION_GRACE_PERIOD: Duration = Duration::from_secs(120);

/// A session with no activity for this long is considered hung.
pub const IDLE_THRESHOLD: Duration = Duration::from_secs(30 * 60);

pub const REASON_NO_SESSION: &str = "Session does not exist";
pub const REASON_DEAD_PROCESSES: &str = "Session has dead processes";
pub const REASON_WITHIN_GRACE: &str = "Session is new and within grace period";
pub const REASON_IDLE: &str = "Session idle for more than 30 minutes";
pub const REASON_NO_LIVE_CHILD: &str = "No live process attached to session";
pub const REASON_ALIVE: &str = "Session is alive";
pub const REASON_UNCONFIRMED: &str = "Liveness could not be confirmed";

/// Outcome of a liveness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liveness {
    pub live: bool,
    pub reason: &'static str,
}

impl Liveness {
    fn live(reason: &'static str) -> Self {
        Self { live: true, reason }
    }

    fn dead(reason: &'static str) -> Self {
        Self { live: false, reason }
    }
}

/// Check whether an external session is still functioning.
///
/// Ordered conjunction: existence, then no dead panes, then recent
/// activity (suppressed within `grace_period` of creation), then a live
/// attached child process. Adapter query failures fold into "cannot
/// confirm": the session is reported live so grace-period reasoning gets
/// another sweep to decide, rather than failing a project on a flaky
/// query.
pub async fn validate_liveness<S: SessionRegistry>(
    sessions: &S,
    name: &str,
    grace_period: Duration,
) -> Liveness {
    match sessions.session_exists(name).await {
        Ok(false) => return Liveness::dead(REASON_NO_SESSION),
        Ok(true) => {}
        Err(_) => return Liveness::live(REASON_UNCONFIRMED),
    }

    match sessions.has_dead_panes(name).await {
        Ok(true) => return Liveness::dead(REASON_DEAD_PROCESSES),
        Ok(false) => {}
        Err(_) => return Liveness::live(REASON_UNCONFIRMED),
    }

    // New sessions have not had a chance to produce activity yet; report
    // them live without consulting the remaining signals.
    match sessions.session_age(name).await {
        Ok(age) if age <= grace_period => return Liveness::live(REASON_WITHIN_GRACE),
        Ok(_) => {}
        Err(_) => return Liveness::live(REASON_UNCONFIRMED),
    }

    match sessions.idle_time(name).await {
        Ok(idle) if idle > IDLE_THRESHOLD => return Liveness::dead(REASON_IDLE),
        Ok(_) => {}
        Err(_) => return Liveness::live(REASON_UNCONFIRMED),
    }

    match sessions.has_live_child(name).await {
        Ok(false) => Liveness::dead(REASON_NO_LIVE_CHILD),
        Ok(true) => Liveness::live(REASON_ALIVE),
        Err(_) => Liveness::live(REASON_UNCONFIRMED),
    }
}

#[cfg(test)]
#[path = "liveness_tests.rs"]
mod tests;
