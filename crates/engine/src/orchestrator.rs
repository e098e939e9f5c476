// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Component wiring and lifecycle.
//!
//! Construction follows dependency order (buses → engine → runner →
//! scheduler → watcher → retention); shutdown reverses it under a deadline.

use crate::bus::EventBus;
use crate::error::EngineError;
use crate::retention::LogRetention;
use crate::runner::Runner;
use crate::scheduler::Scheduler;
use crate::sync::SyncEngine;
use crate::watcher::Watcher;
use sk_core::{
    Clock, JobProgressEvent, LogLevels, Settings, SystemClock, Task, TaskId,
    TransferProgressEvent,
};
use sk_storage::{ConnectionStore, JobStore, TaskStore};
use sk_transfer::Remotes;
use std::sync::Arc;
use std::time::Duration;

/// Injected collaborators.
pub struct OrchestratorDeps {
    pub tasks: Arc<dyn TaskStore>,
    pub connections: Arc<dyn ConnectionStore>,
    pub jobs: Arc<dyn JobStore>,
    pub remotes: Arc<Remotes>,
}

/// Tunables beyond the persisted settings.
pub struct OrchestratorConfig {
    pub settings: Settings,
    /// Progress sampling interval, clamped to at least 100ms.
    pub sample_interval: Duration,
    /// Realtime debounce window.
    pub debounce: Duration,
    /// Event bus buffer per subscriber.
    pub bus_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            sample_interval: Duration::from_secs(1),
            debounce: crate::watcher::DEFAULT_DEBOUNCE,
            bus_buffer: crate::bus::DEFAULT_BUFFER,
        }
    }
}

/// Owns every core component and their start/stop order.
pub struct Orchestrator<C: Clock = SystemClock> {
    pub job_bus: Arc<EventBus<JobProgressEvent>>,
    pub transfer_bus: Arc<EventBus<TransferProgressEvent>>,
    pub engine: Arc<SyncEngine<C>>,
    pub runner: Arc<Runner<C>>,
    pub scheduler: Scheduler<C>,
    pub watcher: Watcher<C>,
    pub retention: Arc<LogRetention>,
    /// Hierarchical logger-level resolver for the embedding transport.
    pub log_levels: Arc<LogLevels>,
}

impl<C: Clock> Orchestrator<C> {
    pub fn new(deps: OrchestratorDeps, config: OrchestratorConfig, clock: C) -> Self {
        let job_bus = Arc::new(EventBus::new(config.bus_buffer));
        let transfer_bus = Arc::new(EventBus::new(config.bus_buffer));
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&deps.jobs),
            Arc::clone(&deps.remotes),
            Arc::clone(&job_bus),
            Arc::clone(&transfer_bus),
            config.settings.job.auto_delete_empty_jobs,
            config.sample_interval,
            clock,
        ));
        let runner = Arc::new(Runner::new(Arc::clone(&engine), Arc::clone(&deps.connections)));
        let scheduler = Scheduler::new(Arc::clone(&runner), Arc::clone(&deps.tasks));
        let watcher = Watcher::new(Arc::clone(&runner), Arc::clone(&deps.tasks), config.debounce);
        let retention = Arc::new(LogRetention::new(
            Arc::clone(&deps.jobs),
            Arc::clone(&deps.tasks),
            config.settings.log.clone(),
        ));
        let log_levels = Arc::new(LogLevels::new(&config.settings.log));
        Self { job_bus, transfer_bus, engine, runner, scheduler, watcher, retention, log_levels }
    }

    /// Bring every component up, rehydrating schedules and watches from the
    /// task store.
    pub fn start(&self) -> Result<(), EngineError> {
        self.runner.start();
        self.scheduler.start()?;
        self.watcher.start()?;
        self.retention.start()?;
        tracing::info!("orchestrator started");
        Ok(())
    }

    /// Shut down in reverse order, bounding the wait for in-flight runs.
    pub async fn stop(&self, deadline: Duration) {
        self.watcher.stop();
        self.scheduler.stop();
        if tokio::time::timeout(deadline, self.runner.stop()).await.is_err() {
            tracing::warn!(?deadline, "shutdown deadline hit while waiting for runs");
        }
        self.retention.stop();
        self.job_bus.close();
        self.transfer_bus.close();
        tracing::info!("orchestrator stopped");
    }

    /// Register a freshly created task with the scheduler and watcher.
    pub fn task_created(&self, task: &Task) -> Result<(), EngineError> {
        self.scheduler.add(task)?;
        self.watcher.add(task)
    }

    /// Re-register a mutated task.
    pub fn task_updated(&self, task: &Task) -> Result<(), EngineError> {
        self.scheduler.update(task)?;
        self.watcher.update(task)
    }

    /// Retract a deleted task everywhere and cancel its active run.
    pub async fn task_deleted(&self, id: TaskId) {
        self.scheduler.remove(id);
        self.watcher.remove(id);
        self.runner.stop_task(id).await;
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
