// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron-driven task triggering.
//!
//! One timer loop per scheduled task; each loop sleeps until the next cron
//! fire and asks the runner to start the task. Only tasks are scheduled
//! here — the retention sweeper runs on its own cron loop.

use crate::error::EngineError;
use crate::runner::Runner;
use cron::Schedule;
use parking_lot::Mutex;
use sk_core::{Clock, SystemClock, Task, TaskId, Trigger};
use sk_storage::TaskStore;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Parse a 5- or 6-field cron expression.
///
/// Five-field expressions gain a seconds field of `0`; malformed input is a
/// precondition error, surfaced at add time.
pub fn parse_schedule(expr: &str) -> Result<Schedule, EngineError> {
    let expr = expr.trim();
    let normalized = match expr.split_whitespace().count() {
        5 => format!("0 {expr}"),
        6 => expr.to_string(),
        n => {
            return Err(EngineError::Precondition(format!(
                "cron expression '{expr}' has {n} fields, expected 5 or 6"
            )))
        }
    };
    Schedule::from_str(&normalized)
        .map_err(|e| EngineError::Precondition(format!("invalid cron expression '{expr}': {e}")))
}

struct SchedulerEntry {
    token: CancellationToken,
}

/// Registers one cron loop per task with a non-empty schedule.
pub struct Scheduler<C: Clock = SystemClock> {
    runner: Arc<Runner<C>>,
    tasks: Arc<dyn TaskStore>,
    entries: Mutex<HashMap<TaskId, SchedulerEntry>>,
}

impl<C: Clock> Scheduler<C> {
    pub fn new(runner: Arc<Runner<C>>, tasks: Arc<dyn TaskStore>) -> Self {
        Self { runner, tasks, entries: Mutex::new(HashMap::new()) }
    }

    /// Register `task`'s schedule. A task without a schedule is a no-op.
    pub fn add(&self, task: &Task) -> Result<(), EngineError> {
        if !task.has_schedule() {
            return Ok(());
        }
        let schedule = parse_schedule(&task.schedule)?;
        let token = CancellationToken::new();

        {
            let mut entries = self.entries.lock();
            if let Some(old) = entries.insert(task.id, SchedulerEntry { token: token.clone() }) {
                old.token.cancel();
            }
        }

        tracing::info!(task = %task.name, schedule = %task.schedule, "schedule registered");
        let runner = Arc::clone(&self.runner);
        let task = task.clone();
        tokio::spawn(async move {
            loop {
                let Some(next) = schedule.upcoming(chrono::Utc).next() else {
                    tracing::warn!(task = %task.name, "schedule has no future fire times");
                    break;
                };
                let delay = (next - chrono::Utc::now()).to_std().unwrap_or_default();
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {
                        tracing::debug!(task = %task.name, "schedule fired");
                        if let Err(error) = runner.start_task(&task, Trigger::Schedule).await {
                            tracing::warn!(task = %task.name, %error, "scheduled start failed");
                        }
                    }
                }
            }
        });
        Ok(())
    }

    /// Retract `task`'s schedule. Idempotent.
    pub fn remove(&self, id: TaskId) {
        if let Some(entry) = self.entries.lock().remove(&id) {
            entry.token.cancel();
        }
    }

    /// Re-register after a task mutation.
    pub fn update(&self, task: &Task) -> Result<(), EngineError> {
        self.remove(task.id);
        self.add(task)
    }

    /// Register every stored task with a schedule. Individual failures are
    /// logged and skipped so one bad expression cannot block startup.
    pub fn start(&self) -> Result<(), EngineError> {
        for task in self.tasks.list_all()? {
            if !task.has_schedule() {
                continue;
            }
            if let Err(error) = self.add(&task) {
                tracing::warn!(task = %task.name, %error, "skipping unschedulable task");
            }
        }
        Ok(())
    }

    /// Cancel every cron loop.
    pub fn stop(&self) {
        let mut entries = self.entries.lock();
        for (_, entry) in entries.drain() {
            entry.token.cancel();
        }
    }

    pub fn scheduled_count(&self) -> usize {
        self.entries.lock().len()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
