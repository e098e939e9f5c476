// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic per-connection log trimming.
//!
//! Runs on its own cron loop, independent of the task scheduler. Each sweep
//! trims every connection to the configured cap, keeping the newest logs;
//! per-connection failures are logged and the sweep moves on.

use crate::error::EngineError;
use crate::scheduler::parse_schedule;
use parking_lot::Mutex;
use sk_core::{ConnectionId, LogSettings};
use sk_storage::{JobStore, TaskStore};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Sweeper enforcing `max_logs_per_connection`.
pub struct LogRetention {
    jobs: Arc<dyn JobStore>,
    tasks: Arc<dyn TaskStore>,
    settings: LogSettings,
    token: Mutex<Option<CancellationToken>>,
}

impl LogRetention {
    pub fn new(jobs: Arc<dyn JobStore>, tasks: Arc<dyn TaskStore>, settings: LogSettings) -> Self {
        Self { jobs, tasks, settings, token: Mutex::new(None) }
    }

    /// Start the sweep loop. A cap of 0 disables the policy entirely.
    pub fn start(&self) -> Result<(), EngineError> {
        let keep = self.settings.max_logs_per_connection;
        if keep == 0 {
            tracing::info!("log retention disabled");
            return Ok(());
        }
        let schedule = parse_schedule(&self.settings.cleanup_schedule)?;

        let token = CancellationToken::new();
        if let Some(old) = self.token.lock().replace(token.clone()) {
            old.cancel();
        }

        let jobs = Arc::clone(&self.jobs);
        let tasks = Arc::clone(&self.tasks);
        tokio::spawn(async move {
            loop {
                let Some(next) = schedule.upcoming(chrono::Utc).next() else { break };
                let delay = (next - chrono::Utc::now()).to_std().unwrap_or_default();
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => sweep(&jobs, &tasks, keep),
                }
            }
        });
        Ok(())
    }

    pub fn stop(&self) {
        if let Some(token) = self.token.lock().take() {
            token.cancel();
        }
    }

    /// One full sweep over every connection referenced by a task.
    pub fn sweep_once(&self) {
        sweep(&self.jobs, &self.tasks, self.settings.max_logs_per_connection);
    }
}

fn sweep(jobs: &Arc<dyn JobStore>, tasks: &Arc<dyn TaskStore>, keep: u64) {
    if keep == 0 {
        return;
    }
    let connections: BTreeSet<ConnectionId> = match tasks.list_all() {
        Ok(tasks) => tasks.into_iter().map(|t| t.connection_id).collect(),
        Err(error) => {
            tracing::warn!(%error, "log retention: cannot list tasks");
            return;
        }
    };
    for conn in connections {
        if let Err(error) = sweep_connection(jobs, conn, keep) {
            tracing::warn!(connection = %conn, %error, "log retention sweep failed");
        }
    }
}

fn sweep_connection(
    jobs: &Arc<dyn JobStore>,
    conn: ConnectionId,
    keep: u64,
) -> Result<(), EngineError> {
    let excess = jobs.list_old_logs_for_connection(conn, keep)?;
    if excess.is_empty() {
        return Ok(());
    }
    let removed = jobs.delete_logs(&excess)?;
    tracing::info!(connection = %conn, removed, "trimmed old job logs");
    Ok(())
}

#[cfg(test)]
#[path = "retention_tests.rs"]
mod tests;
