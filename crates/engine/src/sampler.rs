// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-job progress sampling.
//!
//! One sampler runs for the lifetime of a job: it polls the run's stats on
//! a ticker and fans snapshots out to the job and transfer buses. The final
//! event, carrying the terminal status, is published after the engine stops
//! the sampler.

use crate::bus::EventBus;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sk_core::{
    Clock, ConnectionId, FileTransfer, JobId, JobProgressEvent, JobStatus, TaskId,
    TransferProgressEvent,
};
use sk_transfer::TransferStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Floor for the sampling interval.
pub(crate) const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Everything a sampler needs for one job.
pub struct SamplerParams<C: Clock> {
    pub job_id: JobId,
    pub task_id: TaskId,
    pub connection_id: ConnectionId,
    pub stats: Arc<TransferStats>,
    pub job_bus: Arc<EventBus<JobProgressEvent>>,
    pub transfer_bus: Arc<EventBus<TransferProgressEvent>>,
    pub interval: Duration,
    pub start_time: DateTime<Utc>,
    pub clock: C,
}

type FinalState = Arc<Mutex<Option<(JobStatus, Option<DateTime<Utc>>)>>>;

/// Handle held by the engine while a sampler runs.
pub struct SamplerHandle {
    cancel: CancellationToken,
    final_state: FinalState,
    task: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    /// Record the terminal state, stop the sampler, and wait until the final
    /// event has been published.
    pub async fn finish(mut self, status: JobStatus, end_time: Option<DateTime<Utc>>) {
        *self.final_state.lock() = Some((status, end_time));
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SamplerHandle {
    fn drop(&mut self) {
        // A handle dropped without finish() (the run panicked) must not
        // leak a forever-ticking sampler.
        self.cancel.cancel();
    }
}

pub struct ProgressSampler;

impl ProgressSampler {
    pub fn spawn<C: Clock>(params: SamplerParams<C>) -> SamplerHandle {
        let cancel = CancellationToken::new();
        let final_state: FinalState = Arc::new(Mutex::new(None));
        let task = tokio::spawn(sample_loop(params, cancel.clone(), Arc::clone(&final_state)));
        SamplerHandle { cancel, final_state, task: Some(task) }
    }
}

fn progress_event<C: Clock>(
    params: &SamplerParams<C>,
    status: JobStatus,
    end_time: Option<DateTime<Utc>>,
) -> JobProgressEvent {
    let stats = &params.stats;
    JobProgressEvent {
        job_id: params.job_id,
        task_id: params.task_id,
        connection_id: params.connection_id,
        status,
        files_transferred: stats.transfers(),
        bytes_transferred: stats.bytes(),
        files_total: stats.total_transfers(),
        bytes_total: stats.total_bytes(),
        files_deleted: stats.deletes(),
        error_count: stats.errors(),
        start_time: params.start_time,
        end_time,
    }
}

async fn sample_loop<C: Clock>(params: SamplerParams<C>, cancel: CancellationToken, final_state: FinalState) {
    let mut ticker = tokio::time::interval(params.interval.max(MIN_SAMPLE_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                params.job_bus.publish(&progress_event(&params, JobStatus::Running, None));
                let transfers: Vec<FileTransfer> = params
                    .stats
                    .in_flight()
                    .into_iter()
                    .map(|t| FileTransfer { name: t.name, size: t.size, bytes: t.bytes })
                    .collect();
                params.transfer_bus.publish(&TransferProgressEvent {
                    job_id: params.job_id,
                    task_id: params.task_id,
                    connection_id: params.connection_id,
                    transfers,
                });
            }
        }
    }

    // Cancelled without a recorded outcome means the run was torn down;
    // report it as cancelled rather than leaving subscribers hanging.
    let (status, end_time) = final_state
        .lock()
        .take()
        .unwrap_or((JobStatus::Cancelled, Some(params.clock.now_utc())));
    params.job_bus.publish(&progress_event(&params, status, end_time));
}

#[cfg(test)]
#[path = "sampler_tests.rs"]
mod tests;
