// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::Harness;
use sk_core::JobStatus;
use sk_storage::JobStore;
use std::time::Duration;

async fn settle(runner: &Runner<sk_core::SystemClock>, task: &Task) {
    // Wait for the run map to drain for this task; the job row is final
    // before the run removes itself.
    for _ in 0..500 {
        if !runner.is_running(task.id).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("run for task {} did not settle", task.name);
}

#[tokio::test]
async fn start_task_runs_to_completion() {
    let h = Harness::new();
    let runner = h.runner();
    let conn = h.local_connection();
    let task = h.task_for(&conn);
    h.write_source(&task, "a.txt", "payload");

    runner.start_task(&task, Trigger::Manual).await.unwrap();
    settle(&runner, &task).await;

    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Success);
}

#[tokio::test]
async fn invalid_task_is_rejected_without_job() {
    let h = Harness::new();
    let runner = h.runner();
    let conn = h.local_connection();
    let mut task = h.task_for(&conn);
    task.name = String::new();

    let err = runner.start_task(&task, Trigger::Manual).await.unwrap_err();
    assert!(matches!(err, EngineError::Precondition(_)));
    assert!(h.store.jobs_for_task(task.id).unwrap().is_empty());
}

#[tokio::test]
async fn unknown_connection_is_a_precondition_error() {
    let h = Harness::new();
    let runner = h.runner();
    let task = Task::builder().source_path(h.dir.path()).build();

    let err = runner.start_task(&task, Trigger::Manual).await.unwrap_err();
    assert!(matches!(err, EngineError::Precondition(_)));
}

#[tokio::test]
async fn stop_task_cancels_active_run() {
    let h = Harness::new();
    let runner = h.runner();
    let conn = h.gated_connection();
    let task = h.task_for(&conn);
    h.write_source(&task, "slow.txt", "payload");

    runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.gate.wait_started(1).await;
    assert!(runner.is_running(task.id).await);

    runner.stop_task(task.id).await;
    assert!(!runner.is_running(task.id).await);
    settle(&runner, &task).await;

    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Cancelled);
    assert!(jobs[0].errors.as_deref().unwrap().contains("cancelled"));
}

#[tokio::test]
async fn stop_task_without_run_is_a_noop() {
    let h = Harness::new();
    let runner = h.runner();
    runner.stop_task(TaskId::new()).await;
}

#[tokio::test]
async fn realtime_trigger_is_absorbed_by_active_run() {
    let h = Harness::new();
    let runner = h.runner();
    let conn = h.gated_connection();
    let task = h.task_for(&conn);
    h.write_source(&task, "slow.txt", "payload");

    runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.gate.wait_started(1).await;

    // A burst of realtime triggers while the run is active.
    for _ in 0..10 {
        runner.start_task(&task, Trigger::Realtime).await.unwrap();
    }
    assert_eq!(h.gate.entered(), 1, "no second run may start");

    h.gate.release();
    settle(&runner, &task).await;
    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Success);
}

#[tokio::test]
async fn manual_restart_replaces_running_run() {
    let h = Harness::new();
    let runner = h.runner();
    let conn = h.gated_connection();
    let task = h.task_for(&conn);
    h.write_source(&task, "slow.txt", "payload");

    runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.gate.wait_started(1).await;

    // Second start cancels the first run and waits for it to exit.
    runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.gate.wait_started(2).await;
    assert!(runner.is_running(task.id).await);

    h.gate.release();
    settle(&runner, &task).await;

    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].status, JobStatus::Cancelled);
    assert_eq!(jobs[1].status, JobStatus::Success);
}

#[tokio::test]
async fn stop_waits_for_all_runs() {
    let h = Harness::new();
    let runner = h.runner();
    let conn = h.gated_connection();
    let task_a = h.task_for(&conn);
    let task_b = h.task_for(&conn);
    h.write_source(&task_a, "a.txt", "payload");
    h.write_source(&task_b, "b.txt", "payload");

    runner.start_task(&task_a, Trigger::Manual).await.unwrap();
    runner.start_task(&task_b, Trigger::Manual).await.unwrap();
    h.gate.wait_started(2).await;

    runner.stop().await;
    assert!(!runner.is_running(task_a.id).await);
    assert!(!runner.is_running(task_b.id).await);

    for task in [&task_a, &task_b] {
        let jobs = h.store.jobs_for_task(task.id).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Cancelled);
    }
}

#[tokio::test]
async fn concurrent_tasks_run_independently() {
    let h = Harness::new();
    let runner = h.runner();
    let conn = h.local_connection();
    let task_a = h.task_for(&conn);
    let task_b = h.task_for(&conn);
    h.write_source(&task_a, "a.txt", "aa");
    h.write_source(&task_b, "b.txt", "bbb");

    runner.start_task(&task_a, Trigger::Manual).await.unwrap();
    runner.start_task(&task_b, Trigger::Schedule).await.unwrap();
    settle(&runner, &task_a).await;
    settle(&runner, &task_b).await;

    assert_eq!(h.store.jobs_for_task(task_a.id).unwrap()[0].status, JobStatus::Success);
    assert_eq!(h.store.jobs_for_task(task_b.id).unwrap()[0].status, JobStatus::Success);
}

#[tokio::test]
async fn start_stop_interleavings_do_not_deadlock() {
    let h = Harness::new();
    let runner = h.runner();
    let conn = h.gated_connection();
    let task = h.task_for(&conn);
    h.write_source(&task, "slow.txt", "payload");
    h.gate.release();

    // Hammer the same task with replace/stop cycles; the done-before-lock
    // dance must never wedge.
    let result = tokio::time::timeout(Duration::from_secs(30), async {
        for round in 0..25 {
            runner.start_task(&task, Trigger::Manual).await.unwrap();
            if round % 3 == 0 {
                runner.stop_task(task.id).await;
            }
            if round % 5 == 0 {
                runner.start_task(&task, Trigger::Realtime).await.unwrap();
            }
        }
        runner.stop().await;
    })
    .await;
    assert!(result.is_ok(), "runner deadlocked");

    // Exactly zero active jobs remain.
    assert!(h.store.active_jobs_for_task(task.id).is_empty());
}

#[tokio::test]
async fn panicking_run_is_recovered_and_recorded_as_failed() {
    let h = Harness::new();
    let runner = h.runner();
    let conn = h.panicking_connection();
    let task = h.task_for(&conn);

    runner.start_task(&task, Trigger::Manual).await.unwrap();
    settle(&runner, &task).await;

    // The panic is contained and the job still reaches a terminal status.
    assert!(!runner.is_running(task.id).await);
    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert!(jobs[0].errors.as_deref().unwrap().contains("internal error"));
    assert!(h.store.active_jobs_for_task(task.id).is_empty());

    // The runner survives to run the next job.
    runner.start_task(&task, Trigger::Manual).await.unwrap();
    runner.stop().await;
}

#[tokio::test]
async fn at_most_one_active_job_per_task() {
    let h = Harness::new();
    let runner = h.runner();
    let conn = h.gated_connection();
    let task = h.task_for(&conn);
    h.write_source(&task, "slow.txt", "payload");

    runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.gate.wait_started(1).await;
    runner.start_task(&task, Trigger::Schedule).await.unwrap();
    h.gate.wait_started(2).await;

    assert!(h.store.active_jobs_for_task(task.id).len() <= 1);

    h.gate.release();
    settle(&runner, &task).await;
    assert!(h.store.active_jobs_for_task(task.id).is_empty());
}
