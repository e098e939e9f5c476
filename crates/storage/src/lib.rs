// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store contracts consumed by the sync core, plus the in-memory store.
//!
//! A SQL-backed store is a drop-in behind the same traits; the core never
//! holds a transaction across an await point.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod memory;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use memory::MemoryStore;

use sk_core::{Connection, ConnectionId, Job, JobId, JobLog, JobLogId, Task, TaskId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("job not found: {0}")]
    JobNotFound(JobId),

    #[error("connection not found: {0}")]
    ConnectionNotFound(ConnectionId),

    #[error("store failure: {0}")]
    Backend(String),
}

/// Read access to task definitions.
pub trait TaskStore: Send + Sync {
    fn get(&self, id: TaskId) -> Result<Task, StoreError>;
    fn list_all(&self) -> Result<Vec<Task>, StoreError>;
}

/// Read access to connections. The core never mutates these.
pub trait ConnectionStore: Send + Sync {
    fn get(&self, id: ConnectionId) -> Result<Connection, StoreError>;
}

/// Persistence for jobs and their logs.
pub trait JobStore: Send + Sync {
    fn create_job(&self, job: &Job) -> Result<(), StoreError>;

    /// Persist the job row as given; the caller owns the state machine.
    fn update_job(&self, job: &Job) -> Result<(), StoreError>;

    fn get_job(&self, id: JobId) -> Result<Job, StoreError>;

    fn jobs_for_task(&self, task: TaskId) -> Result<Vec<Job>, StoreError>;

    /// Delete a job and, by cascade, its logs.
    fn delete_job(&self, id: JobId) -> Result<(), StoreError>;

    fn append_log(&self, log: &JobLog) -> Result<(), StoreError>;

    fn logs_for_job(&self, job: JobId) -> Result<Vec<JobLog>, StoreError>;

    fn count_logs_for_connection(&self, conn: ConnectionId) -> Result<u64, StoreError>;

    /// IDs of the oldest logs beyond the newest `keep` for a connection,
    /// oldest first.
    fn list_old_logs_for_connection(
        &self,
        conn: ConnectionId,
        keep: u64,
    ) -> Result<Vec<JobLogId>, StoreError>;

    /// Delete the given logs, returning how many were removed.
    fn delete_logs(&self, ids: &[JobLogId]) -> Result<u64, StoreError>;
}
