// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrency stress: the cancel-and-replace dance under contention.

use crate::prelude::*;

#[tokio::test]
async fn interleaved_start_and_stop_never_deadlock() {
    let h = SpecHarness::new();
    let conn = h.connection("gated");
    let task = h.task_for(&conn);
    h.write_source(&task, "slow.txt", "payload");
    h.gate.release();

    let runner = Arc::clone(&h.orch.runner);
    let result = tokio::time::timeout(Duration::from_secs(60), async {
        let mut workers = Vec::new();
        for w in 0..4 {
            let runner = Arc::clone(&runner);
            let task = task.clone();
            workers.push(tokio::spawn(async move {
                for round in 0..10 {
                    match (w + round) % 3 {
                        0 => {
                            let _ = runner.start_task(&task, Trigger::Manual).await;
                        }
                        1 => {
                            let _ = runner.start_task(&task, Trigger::Realtime).await;
                        }
                        _ => runner.stop_task(task.id).await,
                    }
                }
            }));
        }
        for worker in workers {
            worker.await.unwrap();
        }
        runner.stop().await;
    })
    .await;
    assert!(result.is_ok(), "runner deadlocked under contention");

    // Invariants after settling: nothing active, every job terminal with a
    // terminal timestamp.
    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert!(h.store.active_jobs_for_task(task.id).is_empty());
    for job in &jobs {
        assert!(job.is_terminal(), "job {} left in {}", job.id, job.status);
        assert!(job.end_time.is_some());
    }
}

#[tokio::test]
async fn many_tasks_run_in_parallel_without_interference() {
    let h = SpecHarness::new();
    let conn = h.connection("local");

    let mut tasks = Vec::new();
    for n in 0..8 {
        let task = h.task_for(&conn);
        h.write_source(&task, &format!("file-{n}.txt"), &format!("payload-{n}"));
        tasks.push(task);
    }

    for task in &tasks {
        h.orch.runner.start_task(task, Trigger::Manual).await.unwrap();
    }
    for task in &tasks {
        h.settle(task).await;
    }

    for task in &tasks {
        let jobs = h.store.jobs_for_task(task.id).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Success);
    }
}

#[tokio::test]
async fn replaced_runs_always_leave_at_most_one_active_job() {
    let h = SpecHarness::new();
    let conn = h.connection("gated");
    let task = h.task_for(&conn);
    h.write_source(&task, "slow.txt", "payload");

    for _ in 0..5 {
        h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
        assert!(h.store.active_jobs_for_task(task.id).len() <= 1);
    }

    h.gate.release();
    h.settle(&task).await;
    assert!(h.store.active_jobs_for_task(task.id).is_empty());

    let jobs = h.store.jobs_for_task(task.id).unwrap();
    let successes = jobs.iter().filter(|j| j.status == JobStatus::Success).count();
    let cancelled = jobs.iter().filter(|j| j.status == JobStatus::Cancelled).count();
    assert_eq!(successes, 1);
    assert_eq!(cancelled, jobs.len() - 1);
}
