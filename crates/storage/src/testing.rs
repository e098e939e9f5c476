// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure-injecting store wrappers for engine tests.

use crate::{JobStore, StoreError};
use sk_core::{ConnectionId, Job, JobId, JobLog, JobLogId, TaskId};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Wraps a [`JobStore`], failing selected operations on demand.
pub struct FlakyJobStore<S> {
    inner: S,
    fail_create: AtomicBool,
    fail_update: AtomicBool,
    /// When > 0, the next N updates fail, then succeed again.
    fail_update_next: AtomicU32,
    fail_delete: AtomicBool,
    update_calls: Arc<AtomicU32>,
}

impl<S: JobStore> FlakyJobStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_create: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            fail_update_next: AtomicU32::new(0),
            fail_delete: AtomicBool::new(false),
            update_calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn fail_create(&self, on: bool) {
        self.fail_create.store(on, Ordering::SeqCst);
    }

    pub fn fail_update(&self, on: bool) {
        self.fail_update.store(on, Ordering::SeqCst);
    }

    /// Fail only the next `n` update calls.
    pub fn fail_update_next(&self, n: u32) {
        self.fail_update_next.store(n, Ordering::SeqCst);
    }

    pub fn fail_delete(&self, on: bool) {
        self.fail_delete.store(on, Ordering::SeqCst);
    }

    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::SeqCst)
    }

    fn injected() -> StoreError {
        StoreError::Backend("injected failure".to_string())
    }
}

impl<S: JobStore> JobStore for FlakyJobStore<S> {
    fn create_job(&self, job: &Job) -> Result<(), StoreError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.create_job(job)
    }

    fn update_job(&self, job: &Job) -> Result<(), StoreError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        let remaining = self.fail_update_next.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_update_next.store(remaining - 1, Ordering::SeqCst);
            return Err(Self::injected());
        }
        self.inner.update_job(job)
    }

    fn get_job(&self, id: JobId) -> Result<Job, StoreError> {
        self.inner.get_job(id)
    }

    fn jobs_for_task(&self, task: TaskId) -> Result<Vec<Job>, StoreError> {
        self.inner.jobs_for_task(task)
    }

    fn delete_job(&self, id: JobId) -> Result<(), StoreError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.inner.delete_job(id)
    }

    fn append_log(&self, log: &JobLog) -> Result<(), StoreError> {
        self.inner.append_log(log)
    }

    fn logs_for_job(&self, job: JobId) -> Result<Vec<JobLog>, StoreError> {
        self.inner.logs_for_job(job)
    }

    fn count_logs_for_connection(&self, conn: ConnectionId) -> Result<u64, StoreError> {
        self.inner.count_logs_for_connection(conn)
    }

    fn list_old_logs_for_connection(
        &self,
        conn: ConnectionId,
        keep: u64,
    ) -> Result<Vec<JobLogId>, StoreError> {
        self.inner.list_old_logs_for_connection(conn, keep)
    }

    fn delete_logs(&self, ids: &[JobLogId]) -> Result<u64, StoreError> {
        self.inner.delete_logs(ids)
    }
}
