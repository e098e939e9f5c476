// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Basic sync outcomes: success, failure, empty-job auto-delete.

use crate::prelude::*;

#[tokio::test]
async fn basic_upload_succeeds() {
    let h = SpecHarness::new();
    let conn = h.connection("local");
    let task = h.task_for(&conn);
    h.write_source(&task, "test.txt", "hello world");

    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.settle(&task).await;

    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(job.status, JobStatus::Success);
    assert_eq!(job.counters.files_transferred, 1);
    assert_eq!(job.counters.bytes_transferred, 11);
    assert!(job.end_time.is_some());

    let copied = std::fs::read_to_string(h.remote_data().join("test.txt")).unwrap();
    assert_eq!(copied, "hello world");

    let logs = h.store.logs_for_job(job.id).unwrap();
    assert!(logs.iter().any(|l| l.path == "test.txt"));
}

#[tokio::test]
async fn missing_source_fails() {
    let h = SpecHarness::new();
    let conn = h.connection("local");
    let mut task = h.task_for(&conn);
    task.source_path = h.dir.path().join("missing");
    h.store.upsert_task(task.clone());

    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.settle(&task).await;

    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert!(!jobs[0].errors.as_deref().unwrap_or_default().is_empty());
}

#[tokio::test]
async fn backend_failure_is_recorded_on_the_job() {
    let h = SpecHarness::new();
    let conn = h.connection("fail");
    let task = h.task_for(&conn);

    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.settle(&task).await;

    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert!(jobs[0].errors.as_deref().unwrap().contains("injected backend failure"));
}

#[tokio::test]
async fn auto_delete_drops_empty_successful_jobs() {
    let mut config = OrchestratorConfig::default();
    config.settings.job.auto_delete_empty_jobs = true;
    let h = SpecHarness::with_config(config);
    let conn = h.connection("local");
    let task = h.task_for(&conn);
    h.write_source(&task, "a.txt", "stable");

    // First run copies; second run finds everything in sync.
    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.settle(&task).await;
    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.settle(&task).await;

    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 1, "the empty second job should be gone");
    assert_eq!(jobs[0].counters.files_transferred, 1);
}

#[tokio::test]
async fn empty_jobs_persist_without_the_flag() {
    let h = SpecHarness::new();
    let conn = h.connection("local");
    let task = h.task_for(&conn);
    h.write_source(&task, "a.txt", "stable");

    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.settle(&task).await;
    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.settle(&task).await;

    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[1].counters.files_transferred, 0);
    assert_eq!(jobs[1].counters.bytes_transferred, 0);
    assert_eq!(jobs[1].status, JobStatus::Success);
}
