// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fmd: the Foreman scheduler daemon.
//!
//! With no arguments, starts the monitoring daemon (single instance per
//! host). `fmd audit [--apply]` runs the state audit once and prints the
//! report instead.

use std::process::ExitCode;
use std::sync::Arc;

use fm_core::SystemClock;
use fm_storage::{QueueStore, SnapshotCache, SnapshotStore};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fm_daemon::adapters::{PsProcessTable, TmuxRegistry};
use fm_daemon::{Config, Daemon, LifecycleError, Scheduler};

const USAGE: &str = "usage: fmd [audit [--apply]]";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => run_daemon().await,
        Some("audit") => {
            let apply = args.iter().any(|a| a == "--apply");
            run_audit(apply).await
        }
        Some("--help" | "-h" | "help") => {
            println!("{USAGE}");
            ExitCode::SUCCESS
        }
        Some(other) => {
            eprintln!("unknown command: {other}\n{USAGE}");
            ExitCode::FAILURE
        }
    }
}

async fn run_daemon() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let daemon = match Daemon::startup(&config) {
        Ok(daemon) => daemon,
        Err(e @ LifecycleError::LockHeld(_)) => {
            eprintln!("fmd: {e}");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            error!("startup failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = daemon.shutdown_token();
    tokio::spawn(async move {
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                error!("cannot install SIGINT handler: {e}");
                return;
            }
        };
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("cannot install SIGTERM handler: {e}");
                return;
            }
        };
        tokio::select! {
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        }
        shutdown.cancel();
    });

    daemon.run().await;
    ExitCode::SUCCESS
}

/// One-shot audit. Runs without the instance lock so it can inspect state
/// while a daemon holds it; repairs go through the same SQLite busy
/// timeout the daemon uses.
async fn run_audit(apply: bool) -> ExitCode {
    let report = async {
        let config = Config::load()?;
        let queue = QueueStore::open(&config.queue_path)?;
        let snapshots =
            SnapshotCache::new(SnapshotStore::new(&config.sessions_path), SystemClock);
        let scheduler = Arc::new(Scheduler::new(
            &config,
            queue,
            snapshots,
            TmuxRegistry::new(),
            PsProcessTable::default(),
            SystemClock,
        ));
        let report = scheduler.audit(!apply).await?;
        Ok::<_, LifecycleError>(report)
    }
    .await;

    match report {
        Ok(report) => {
            println!("{report}");
            if report.dry_run && !report.is_clean() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("audit failed: {e}");
            ExitCode::FAILURE
        }
    }
}
