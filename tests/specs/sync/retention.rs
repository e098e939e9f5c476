// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log retention sweeps.

use crate::prelude::*;
use chrono::{Duration as ChronoDuration, Utc};
use sk_core::{Job, JobLog};

/// Seed `count` logs on a fresh job for `task`, spaced one second apart and
/// ending `end_offset` seconds in the past. Returns the job id.
fn seed_logs(store: &MemoryStore, task: &Task, count: usize, end_offset: i64) -> sk_core::JobId {
    let mut job = Job::new(task.id, Trigger::Manual, Utc::now());
    store.create_job(&job).unwrap();
    job.mark_running().unwrap();
    store.update_job(&job).unwrap();
    for n in 0..count {
        let time = Utc::now()
            - ChronoDuration::seconds(end_offset)
            - ChronoDuration::seconds((count - n) as i64);
        let log = JobLog::new(job.id, time, LogLevel::Info, format!("f{n}"), "copied");
        store.append_log(&log).unwrap();
    }
    job.id
}

#[tokio::test]
async fn sweep_keeps_the_newest_thousand_per_connection() {
    let h = SpecHarness::new();
    let conn = h.connection("local");
    let task_a = h.task_for(&conn);
    let task_b = h.task_for(&conn);

    // 1500 logs across two tasks of connection C: the oldest 500 belong to
    // job A, the newest 1000 to job B.
    let job_a = seed_logs(&h.store, &task_a, 500, 2000);
    let job_b = seed_logs(&h.store, &task_b, 1000, 0);

    h.orch.retention.sweep_once();

    assert_eq!(h.store.count_logs_for_connection(conn.id).unwrap(), 1000);
    assert_eq!(h.store.logs_for_job(job_a).unwrap().len(), 0);
    assert_eq!(h.store.logs_for_job(job_b).unwrap().len(), 1000);
}

#[tokio::test]
async fn sweep_leaves_other_connections_alone() {
    let h = SpecHarness::new();
    let conn_a = h.connection("local");
    let conn_b = {
        let mut config = std::collections::HashMap::new();
        config.insert("root".to_string(), h.dir.path().join("other").display().to_string());
        let conn = Connection::builder().name("other").config(config).build();
        h.store.upsert_connection(conn.clone());
        conn
    };
    let task_a = h.task_for(&conn_a);
    let task_b = h.task_for(&conn_b);

    seed_logs(&h.store, &task_a, 1200, 0);
    seed_logs(&h.store, &task_b, 20, 0);

    h.orch.retention.sweep_once();

    assert_eq!(h.store.count_logs_for_connection(conn_a.id).unwrap(), 1000);
    assert_eq!(h.store.count_logs_for_connection(conn_b.id).unwrap(), 20);
}

#[tokio::test]
async fn zero_cap_disables_the_policy() {
    let mut config = OrchestratorConfig::default();
    config.settings.log.max_logs_per_connection = 0;
    let h = SpecHarness::with_config(config);
    let conn = h.connection("local");
    let task = h.task_for(&conn);
    seed_logs(&h.store, &task, 1500, 0);

    h.orch.retention.sweep_once();
    assert_eq!(h.store.count_logs_for_connection(conn.id).unwrap(), 1500);
}
