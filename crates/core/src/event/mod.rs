// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress event payloads and subscription filters.
//!
//! These are the typed streams the core exposes to the transport layer.

use crate::ids::{ConnectionId, JobId, TaskId};
use crate::job::JobStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Subscriber-side predicate for a typed event stream.
pub type EventFilter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Aggregate progress of one job, sampled while it runs and emitted once
/// more with the terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    pub job_id: JobId,
    pub task_id: TaskId,
    pub connection_id: ConnectionId,
    pub status: JobStatus,
    pub files_transferred: u64,
    pub bytes_transferred: u64,
    /// Monotonic non-decreasing within a job; grows during scan.
    pub files_total: u64,
    pub bytes_total: u64,
    pub files_deleted: u64,
    pub error_count: u64,
    pub start_time: DateTime<Utc>,
    /// Null while the job is running.
    pub end_time: Option<DateTime<Utc>>,
}

/// Point-in-time snapshot of one in-flight file transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTransfer {
    pub name: String,
    pub size: u64,
    pub bytes: u64,
}

/// Per-file progress of one job's active transfers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferProgressEvent {
    pub job_id: JobId,
    pub task_id: TaskId,
    pub connection_id: ConnectionId,
    pub transfers: Vec<FileTransfer>,
}

/// Filter for job progress subscriptions.
///
/// Returns `None` when no criteria are given, meaning "deliver everything".
pub fn job_progress_filter(
    task_id: Option<TaskId>,
    connection_id: Option<ConnectionId>,
) -> Option<EventFilter<JobProgressEvent>> {
    if task_id.is_none() && connection_id.is_none() {
        return None;
    }
    Some(Box::new(move |event| {
        if task_id.is_some_and(|t| t != event.task_id) {
            return false;
        }
        if connection_id.is_some_and(|c| c != event.connection_id) {
            return false;
        }
        true
    }))
}

/// Filter for per-file transfer subscriptions.
///
/// Returns `None` when no criteria are given, meaning "deliver everything".
pub fn transfer_progress_filter(
    connection_id: Option<ConnectionId>,
    task_id: Option<TaskId>,
    job_id: Option<JobId>,
) -> Option<EventFilter<TransferProgressEvent>> {
    if connection_id.is_none() && task_id.is_none() && job_id.is_none() {
        return None;
    }
    Some(Box::new(move |event| {
        if connection_id.is_some_and(|c| c != event.connection_id) {
            return false;
        }
        if task_id.is_some_and(|t| t != event.task_id) {
            return false;
        }
        if job_id.is_some_and(|j| j != event.job_id) {
            return false;
        }
        true
    }))
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
