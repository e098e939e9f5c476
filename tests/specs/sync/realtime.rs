// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Realtime watching: bursts are absorbed by the active run.

use crate::prelude::*;

#[tokio::test]
async fn file_bursts_during_a_run_spawn_no_extra_jobs() {
    let mut config = OrchestratorConfig::default();
    config.debounce = Duration::from_millis(300);
    let h = SpecHarness::with_config(config);
    let conn = h.connection("gated");
    let mut task = h.task_for(&conn);
    task.realtime = true;
    h.store.upsert_task(task.clone());

    h.orch.start().unwrap();
    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.gate.wait_started(1).await;

    // Synthesise a burst of filesystem events on the watched tree while
    // the run is parked at the gate.
    for n in 0..10 {
        h.write_source(&task, &format!("burst-{n}.txt"), "x");
    }
    // Let the debounced delivery land while the run is still active.
    tokio::time::sleep(Duration::from_millis(800)).await;

    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 1, "realtime events must not spawn a second run");
    assert_eq!(h.gate.entered(), 1);

    // Retract the watch before releasing so a straggling delivery cannot
    // start a fresh run after this one completes.
    h.orch.watcher.stop();
    h.gate.release();
    h.settle(&task).await;
    let jobs = h.store.jobs_for_task(task.id).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Success);

    h.orch.stop(Duration::from_secs(10)).await;
}

#[tokio::test]
async fn realtime_trigger_starts_a_run_when_idle() {
    let mut config = OrchestratorConfig::default();
    config.debounce = Duration::from_millis(200);
    let h = SpecHarness::with_config(config);
    let conn = h.connection("local");
    let mut task = h.task_for(&conn);
    task.realtime = true;
    h.store.upsert_task(task.clone());

    h.orch.start().unwrap();
    // Let the watcher arm before producing events.
    tokio::time::sleep(Duration::from_millis(300)).await;
    h.write_source(&task, "fresh.txt", "data");

    let mut triggered = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let jobs = h.store.jobs_for_task(task.id).unwrap();
        if jobs.iter().any(|j| j.trigger == Trigger::Realtime && j.status == JobStatus::Success) {
            triggered = true;
            break;
        }
    }
    assert!(triggered, "watched change never started a run");
    assert!(h.remote_data().join("fresh.txt").exists());

    h.orch.stop(Duration::from_secs(10)).await;
}
