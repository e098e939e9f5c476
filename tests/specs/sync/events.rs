// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus contracts: filters, ordering, drop-on-slow.

use crate::prelude::*;
use chrono::Utc;
use sk_core::JobId;

fn event(task_id: TaskId, connection_id: ConnectionId) -> JobProgressEvent {
    JobProgressEvent {
        job_id: JobId::new(),
        task_id,
        connection_id,
        status: JobStatus::Running,
        files_transferred: 0,
        bytes_transferred: 0,
        files_total: 0,
        bytes_total: 0,
        files_deleted: 0,
        error_count: 0,
        start_time: Utc::now(),
        end_time: None,
    }
}

#[tokio::test]
async fn filters_route_events_to_the_right_subscribers() {
    let bus: EventBus<JobProgressEvent> = EventBus::new(100);
    let t1 = TaskId::new();
    let t2 = TaskId::new();
    let c1 = ConnectionId::new();
    let c2 = ConnectionId::new();

    let mut sub_a = bus.subscribe(job_progress_filter(Some(t1), None));
    let mut sub_b = bus.subscribe(job_progress_filter(None, Some(c2)));

    bus.publish(&event(t1, c1));
    bus.publish(&event(t2, c2));

    let got_a = sub_a.rx.recv().await.unwrap();
    assert_eq!(got_a.task_id, t1);
    assert!(sub_a.rx.try_recv().is_err(), "A must not see the second event");

    let got_b = sub_b.rx.recv().await.unwrap();
    assert_eq!(got_b.connection_id, c2);
    assert!(sub_b.rx.try_recv().is_err(), "B must not see the first event");
}

#[tokio::test]
async fn matching_events_arrive_in_publish_order() {
    let bus: EventBus<JobProgressEvent> = EventBus::new(100);
    let t = TaskId::new();
    let c = ConnectionId::new();
    let mut sub = bus.subscribe(job_progress_filter(Some(t), None));

    let mut published = Vec::new();
    for _ in 0..20 {
        let e = event(t, c);
        published.push(e.job_id);
        bus.publish(&e);
    }
    for expected in published {
        assert_eq!(sub.rx.recv().await.unwrap().job_id, expected);
    }
}

#[tokio::test]
async fn slow_subscriber_drops_without_blocking_others() {
    let bus: EventBus<JobProgressEvent> = EventBus::new(2);
    let t = TaskId::new();
    let c = ConnectionId::new();
    let mut slow = bus.subscribe(None);
    let mut fast = bus.subscribe(None);

    for _ in 0..10 {
        let e = event(t, c);
        bus.publish(&e);
        assert_eq!(fast.rx.recv().await.unwrap().job_id, e.job_id);
    }

    // The slow subscriber kept only its buffer's worth.
    let mut seen = 0;
    while slow.rx.try_recv().is_ok() {
        seen += 1;
    }
    assert_eq!(seen, 2);
}

#[tokio::test]
async fn live_run_reaches_filtered_subscriber_with_terminal_event_last() {
    let h = SpecHarness::new();
    let conn = h.connection("local");
    let task = h.task_for(&conn);
    h.write_source(&task, "a.txt", "abc");

    let mut sub = h.orch.job_bus.subscribe(job_progress_filter(Some(task.id), None));
    let mut other = h.orch.job_bus.subscribe(job_progress_filter(Some(TaskId::new()), None));

    h.orch.runner.start_task(&task, Trigger::Manual).await.unwrap();
    h.settle(&task).await;
    // The sampler has published its terminal event before the run ends.
    let mut statuses = Vec::new();
    while let Ok(e) = sub.rx.try_recv() {
        assert_eq!(e.task_id, task.id);
        statuses.push((e.status, e.end_time));
    }
    let (last_status, last_end) = statuses.last().cloned().unwrap();
    assert_eq!(last_status, JobStatus::Success);
    assert!(last_end.is_some());

    assert!(other.rx.try_recv().is_err(), "filtered-out subscriber saw an event");
}
