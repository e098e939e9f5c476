// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cancellation: stop, cancel-and-replace, pre-cancelled contexts.

use crate::prelude::*;
use sk_engine::ResolvedTask;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn stop_task_during_sync_records_cancelled() {
    let h = SpecHarness::new();
    let conn = h.connection("gated");
    let task = h.task_for(&conn);
    h.write_source(&task, "slow.txt", "payload");

    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.gate.wait_started(1).await;

    h.orch.runner.stop_task(task.id).await;
    h.settle(&task).await;

    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Cancelled);
    assert!(jobs[0].errors.as_deref().unwrap().contains("cancelled"));
}

#[tokio::test]
async fn restart_replaces_the_running_run() {
    let h = SpecHarness::new();
    let conn = h.connection("gated");
    let task = h.task_for(&conn);
    h.write_source(&task, "slow.txt", "payload");

    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.gate.wait_started(1).await;

    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.gate.wait_started(2).await;

    h.gate.release();
    h.settle(&task).await;

    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].status, JobStatus::Cancelled);
    assert_eq!(jobs[1].status, JobStatus::Success);
}

#[tokio::test]
async fn pre_cancelled_context_creates_no_job() {
    let h = SpecHarness::new();
    let conn = h.connection("local");
    let task = h.task_for(&conn);
    h.write_source(&task, "a.txt", "data");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let resolved = ResolvedTask { task: task.clone(), connection: conn };
    let err = h.orch.engine.run_task(cancel, &resolved, Trigger::Manual).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(h.store.jobs_for_task(task.id).unwrap().is_empty());
}

#[tokio::test]
async fn shutdown_cancels_in_flight_runs() {
    let h = SpecHarness::new();
    let conn = h.connection("gated");
    let task = h.task_for(&conn);
    h.write_source(&task, "slow.txt", "payload");

    h.orch.start().unwrap();
    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.gate.wait_started(1).await;

    h.orch.stop(Duration::from_secs(10)).await;

    assert!(!h.orch.runner.is_running(task.id).await);
    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Cancelled);
    assert!(jobs[0].end_time.is_some());
}
