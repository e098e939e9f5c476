// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution of a single job.
//!
//! `run_task` owns the job's status flow: it creates the row, installs the
//! log sink, starts the sampler, dispatches to the transfer backend, and
//! classifies the outcome. In-memory status is authoritative when mid-run
//! persistence fails; the final update is retried once.

use crate::bus::EventBus;
use crate::error::{panic_message, EngineError};
use crate::sampler::{ProgressSampler, SamplerHandle, SamplerParams};
use futures_util::FutureExt;
use sk_core::{
    Clock, Connection, Direction, Job, JobCounters, JobId, JobLog, JobProgressEvent, JobStatus,
    LogLevel, SystemClock, Task, TransferProgressEvent, Trigger,
};
use sk_storage::JobStore;
use sk_transfer::{
    LogSink, Remotes, SyncContext, TransferAction, TransferError, TransferEvent, TransferStats,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A task together with its resolved connection row.
#[derive(Debug, Clone)]
pub struct ResolvedTask {
    pub task: Task,
    pub connection: Connection,
}

/// Executes one job per call, driving status PENDING → RUNNING → terminal.
pub struct SyncEngine<C: Clock = SystemClock> {
    jobs: Arc<dyn JobStore>,
    remotes: Arc<Remotes>,
    job_bus: Arc<EventBus<JobProgressEvent>>,
    transfer_bus: Arc<EventBus<TransferProgressEvent>>,
    auto_delete_empty_jobs: bool,
    sample_interval: Duration,
    clock: C,
}

impl<C: Clock> SyncEngine<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: Arc<dyn JobStore>,
        remotes: Arc<Remotes>,
        job_bus: Arc<EventBus<JobProgressEvent>>,
        transfer_bus: Arc<EventBus<TransferProgressEvent>>,
        auto_delete_empty_jobs: bool,
        sample_interval: Duration,
        clock: C,
    ) -> Self {
        Self {
            jobs,
            remotes,
            job_bus,
            transfer_bus,
            auto_delete_empty_jobs,
            sample_interval,
            clock,
        }
    }

    /// Run one job for `resolved`, blocking until the transfer finishes,
    /// fails, or the context is cancelled.
    ///
    /// A context that is already cancelled returns without creating a job.
    pub async fn run_task(
        &self,
        cancel: CancellationToken,
        resolved: &ResolvedTask,
        trigger: Trigger,
    ) -> Result<(), EngineError> {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let task = &resolved.task;

        let mut job = Job::new(task.id, trigger, self.clock.now_utc());
        self.jobs.create_job(&job)?;
        if let Err(e) = job.mark_running() {
            return Err(EngineError::Internal(e.to_string()));
        }
        self.persist_mid_run(&job);
        tracing::info!(
            job_id = %job.id,
            task = %task.name,
            direction = %task.direction,
            trigger = %trigger,
            "sync started"
        );

        let stats = Arc::new(TransferStats::new());
        let sampler = self.spawn_sampler(&job, resolved, Arc::clone(&stats));
        let sink = self.log_sink(job.id);

        // Recover panics at the run boundary so the job still reaches a
        // terminal status.
        let result = std::panic::AssertUnwindSafe(
            self.dispatch(&cancel, resolved, Arc::clone(&stats), sink),
        )
        .catch_unwind()
        .await;

        let (status, errors, outcome) = if cancel.is_cancelled() {
            (JobStatus::Cancelled, Some("cancelled".to_string()), Err(EngineError::Cancelled))
        } else {
            match result {
                Ok(Ok(())) => (JobStatus::Success, None, Ok(())),
                Ok(Err(e)) => {
                    let text = e.to_string();
                    (JobStatus::Failed, Some(text), Err(EngineError::Transfer(e)))
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref()).to_string();
                    tracing::error!(job_id = %job.id, panic = %message, "run panicked");
                    (
                        JobStatus::Failed,
                        Some(format!("internal error: {message}")),
                        Err(EngineError::Internal(message)),
                    )
                }
            }
        };

        job.counters = JobCounters {
            files_transferred: stats.transfers(),
            bytes_transferred: stats.bytes(),
            files_deleted: stats.deletes(),
            error_count: stats.errors(),
        };
        let end_time = self.clock.now_utc();
        if let Err(e) = job.finalize(status, end_time, errors) {
            tracing::error!(job_id = %job.id, error = %e, "job state guard violated");
        }
        self.persist_final(&job);
        sampler.finish(job.status, job.end_time).await;

        tracing::info!(
            job_id = %job.id,
            status = %job.status,
            files = job.counters.files_transferred,
            bytes = job.counters.bytes_transferred,
            "sync finished"
        );

        self.maybe_delete_empty(&job);
        outcome
    }

    fn spawn_sampler(
        &self,
        job: &Job,
        resolved: &ResolvedTask,
        stats: Arc<TransferStats>,
    ) -> SamplerHandle {
        ProgressSampler::spawn(SamplerParams {
            job_id: job.id,
            task_id: resolved.task.id,
            connection_id: resolved.connection.id,
            stats,
            job_bus: Arc::clone(&self.job_bus),
            transfer_bus: Arc::clone(&self.transfer_bus),
            interval: self.sample_interval,
            start_time: job.start_time,
            clock: self.clock.clone(),
        })
    }

    async fn dispatch(
        &self,
        cancel: &CancellationToken,
        resolved: &ResolvedTask,
        stats: Arc<TransferStats>,
        sink: LogSink,
    ) -> Result<(), TransferError> {
        let task = &resolved.task;
        let fs = self.remotes.open(&resolved.connection, &task.remote_path)?;
        let ctx = SyncContext::new(cancel.clone(), stats, Some(sink));
        match task.direction {
            Direction::Upload => fs.sync_from_local(&ctx, &task.source_path).await,
            Direction::Download => fs.sync_to_local(&ctx, &task.source_path).await,
            Direction::Bidirectional => {
                fs.bisync(&ctx, &task.source_path, task.options.conflict_resolution).await
            }
        }
    }

    /// Translate backend file events into job log rows.
    fn log_sink(&self, job_id: JobId) -> LogSink {
        let jobs = Arc::clone(&self.jobs);
        let clock = self.clock.clone();
        Arc::new(move |event: TransferEvent| {
            let level = match event.action {
                TransferAction::Error => LogLevel::Error,
                _ => LogLevel::Info,
            };
            let message = if event.message.is_empty() {
                event.action.to_string()
            } else {
                format!("{}: {}", event.action, event.message)
            };
            let log = JobLog::new(job_id, clock.now_utc(), level, event.path, message);
            if let Err(error) = jobs.append_log(&log) {
                tracing::debug!(job_id = %job_id, %error, "dropping job log");
            }
        })
    }

    /// Mid-run persistence failures leave the in-memory job authoritative.
    fn persist_mid_run(&self, job: &Job) {
        if let Err(error) = self.jobs.update_job(job) {
            tracing::error!(job_id = %job.id, %error, "failed to persist job status");
        }
    }

    /// Final update, retried once; a second failure is logged and the run's
    /// own outcome is returned regardless.
    fn persist_final(&self, job: &Job) {
        if let Err(error) = self.jobs.update_job(job) {
            tracing::error!(job_id = %job.id, %error, "final job update failed, retrying");
            if let Err(error) = self.jobs.update_job(job) {
                tracing::error!(job_id = %job.id, %error, "final job update failed twice");
            }
        }
    }

    /// Drop a successful job that moved nothing, when configured to.
    fn maybe_delete_empty(&self, job: &Job) {
        if !self.auto_delete_empty_jobs || !job.is_empty_success() {
            return;
        }
        match self.jobs.delete_job(job.id) {
            Ok(()) => tracing::debug!(job_id = %job.id, "deleted empty job"),
            Err(error) => {
                tracing::warn!(job_id = %job.id, %error, "failed to delete empty job");
            }
        }
    }
}

#[cfg(test)]
#[path = "sync_tests.rs"]
mod tests;
