// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-task run supervision.
//!
//! At most one run per task at any instant. Manual and scheduled starts
//! cancel-and-replace an active run; realtime starts are absorbed by it.
//! `stop` waits for every spawned run to return.

use crate::error::{panic_message, EngineError};
use crate::sync::{ResolvedTask, SyncEngine};
use futures_util::FutureExt;
use sk_core::{Clock, RunId, SystemClock, Task, TaskId, Trigger};
use sk_storage::ConnectionStore;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

struct RunInfo {
    run_id: RunId,
    cancel: CancellationToken,
    /// Closed by the run task on exit, before it re-acquires the run map.
    done: CancellationToken,
}

/// Supervisor enforcing at-most-one active run per task.
pub struct Runner<C: Clock = SystemClock> {
    engine: Arc<SyncEngine<C>>,
    connections: Arc<dyn ConnectionStore>,
    runs: Arc<Mutex<HashMap<TaskId, RunInfo>>>,
    tracker: TaskTracker,
}

impl<C: Clock> Runner<C> {
    pub fn new(engine: Arc<SyncEngine<C>>, connections: Arc<dyn ConnectionStore>) -> Self {
        Self {
            engine,
            connections,
            runs: Arc::new(Mutex::new(HashMap::new())),
            tracker: TaskTracker::new(),
        }
    }

    pub fn start(&self) {
        self.tracker.reopen();
    }

    /// Start a run for `task`.
    ///
    /// With an active run: a realtime trigger is a no-op (the in-progress
    /// run absorbs the event); any other trigger cancels the old run and
    /// waits for it to exit before starting the new one.
    pub async fn start_task(&self, task: &Task, trigger: Trigger) -> Result<(), EngineError> {
        task.validate()?;
        let connection = self
            .connections
            .get(task.connection_id)
            .map_err(|e| EngineError::Precondition(e.to_string()))?;
        let resolved = ResolvedTask { task: task.clone(), connection };

        let run_id = RunId::new();
        let mut runs = self.runs.lock().await;
        if let Some(existing) = runs.get(&task.id) {
            if trigger == Trigger::Realtime {
                tracing::debug!(task = %task.name, "realtime trigger absorbed by active run");
                return Ok(());
            }
            existing.cancel.cancel();
            // Wait while holding the map lock. This cannot deadlock: the
            // exiting run closes `done` before it takes the lock to remove
            // itself.
            existing.done.cancelled().await;
            runs.remove(&task.id);
        }

        // Fresh root context: the run must outlive the caller.
        let cancel = CancellationToken::new();
        let done = CancellationToken::new();
        runs.insert(
            task.id,
            RunInfo { run_id, cancel: cancel.clone(), done: done.clone() },
        );
        drop(runs);

        tracing::debug!(task = %task.name, run = %run_id.short(), trigger = %trigger, "run starting");
        let engine = Arc::clone(&self.engine);
        let runs_map = Arc::clone(&self.runs);
        let task_id = task.id;
        let task_name = task.name.clone();
        self.tracker.spawn(async move {
            let outcome =
                AssertUnwindSafe(engine.run_task(cancel, &resolved, trigger)).catch_unwind().await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) if error.is_cancelled() => {
                    tracing::info!(task = %task_name, "run cancelled");
                }
                Ok(Err(error)) => tracing::error!(task = %task_name, %error, "run failed"),
                Err(panic) => {
                    tracing::error!(
                        task = %task_name,
                        panic = panic_message(panic.as_ref()),
                        "run panicked"
                    );
                }
            }
            // Close done before taking the lock: a replacing start_task may
            // be waiting on it while holding the lock.
            done.cancel();
            let mut runs = runs_map.lock().await;
            if runs.get(&task_id).is_some_and(|info| info.run_id == run_id) {
                runs.remove(&task_id);
            }
        });
        Ok(())
    }

    /// Cancel the task's active run, if any, and wait for it to exit.
    pub async fn stop_task(&self, id: TaskId) {
        let mut runs = self.runs.lock().await;
        if let Some(info) = runs.get(&id) {
            info.cancel.cancel();
            info.done.cancelled().await;
            runs.remove(&id);
        }
    }

    pub async fn is_running(&self, id: TaskId) -> bool {
        self.runs.lock().await.contains_key(&id)
    }

    /// Cancel every active run and wait for all run tasks to return.
    pub async fn stop(&self) {
        {
            let runs = self.runs.lock().await;
            for info in runs.values() {
                info.cancel.cancel();
            }
        }
        self.tracker.close();
        self.tracker.wait().await;
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
