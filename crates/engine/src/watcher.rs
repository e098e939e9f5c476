// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime filesystem triggering.
//!
//! Each realtime task watches its source tree through a debouncer, so a
//! burst of changes becomes one delivery. The runner absorbs triggers that
//! arrive while a run is active, so file churn during a sync never cancels
//! it.

use crate::error::EngineError;
use crate::runner::Runner;
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use parking_lot::Mutex;
use sk_core::{Clock, SystemClock, Task, TaskId, Trigger};
use sk_storage::TaskStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Debounce window applied when none is configured.
pub(crate) const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(2);

struct WatchEntry {
    // Held for its side effect: dropping stops the watch.
    _debouncer: Debouncer<RecommendedWatcher>,
    token: CancellationToken,
}

/// Watches the source trees of realtime tasks.
pub struct Watcher<C: Clock = SystemClock> {
    runner: Arc<Runner<C>>,
    tasks: Arc<dyn TaskStore>,
    debounce: Duration,
    watches: Mutex<HashMap<TaskId, WatchEntry>>,
}

impl<C: Clock> Watcher<C> {
    pub fn new(runner: Arc<Runner<C>>, tasks: Arc<dyn TaskStore>, debounce: Duration) -> Self {
        Self { runner, tasks, debounce, watches: Mutex::new(HashMap::new()) }
    }

    /// Watch `task`'s source tree. A task without the realtime flag is a
    /// no-op; a missing source path is a precondition error.
    pub fn add(&self, task: &Task) -> Result<(), EngineError> {
        if !task.realtime {
            return Ok(());
        }
        if !task.source_path.exists() {
            return Err(EngineError::Precondition(format!(
                "watch path does not exist: {}",
                task.source_path.display()
            )));
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = new_debouncer(self.debounce, move |result: DebounceEventResult| {
            let _ = tx.send(result);
        })
        .map_err(|e| EngineError::Internal(format!("failed to create watcher: {e}")))?;
        debouncer
            .watcher()
            .watch(&task.source_path, RecursiveMode::Recursive)
            .map_err(|e| {
                EngineError::Precondition(format!(
                    "cannot watch {}: {e}",
                    task.source_path.display()
                ))
            })?;

        let token = CancellationToken::new();
        {
            let mut watches = self.watches.lock();
            if let Some(old) = watches.insert(
                task.id,
                WatchEntry { _debouncer: debouncer, token: token.clone() },
            ) {
                old.token.cancel();
            }
        }

        tracing::info!(task = %task.name, path = %task.source_path.display(), "watch registered");
        let runner = Arc::clone(&self.runner);
        let task = task.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = rx.recv() => match received {
                        Some(Ok(events)) if !events.is_empty() => {
                            tracing::debug!(
                                task = %task.name,
                                events = events.len(),
                                "filesystem activity"
                            );
                            if let Err(error) = runner.start_task(&task, Trigger::Realtime).await {
                                tracing::warn!(task = %task.name, %error, "realtime start failed");
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(errors)) => {
                            tracing::warn!(task = %task.name, ?errors, "watch error");
                        }
                        None => break,
                    }
                }
            }
        });
        Ok(())
    }

    /// Stop watching. Idempotent.
    pub fn remove(&self, id: TaskId) {
        if let Some(entry) = self.watches.lock().remove(&id) {
            entry.token.cancel();
        }
    }

    /// Re-register after a task mutation.
    pub fn update(&self, task: &Task) -> Result<(), EngineError> {
        self.remove(task.id);
        self.add(task)
    }

    /// Watch every stored realtime task. Per-task failures are logged and
    /// skipped so one bad watch cannot take the others down.
    pub fn start(&self) -> Result<(), EngineError> {
        for task in self.tasks.list_all()? {
            if !task.realtime {
                continue;
            }
            if let Err(error) = self.add(&task) {
                tracing::warn!(task = %task.name, %error, "skipping unwatchable task");
            }
        }
        Ok(())
    }

    /// Drop every watch.
    pub fn stop(&self) {
        let mut watches = self.watches.lock();
        for (_, entry) in watches.drain() {
            entry.token.cancel();
        }
    }

    pub fn watched_count(&self) -> usize {
        self.watches.lock().len()
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
