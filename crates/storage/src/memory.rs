// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory store backing all three contracts.

use crate::{ConnectionStore, JobStore, StoreError, TaskStore};
use parking_lot::Mutex;
use sk_core::{Connection, ConnectionId, Job, JobId, JobLog, JobLogId, Task, TaskId};
use std::collections::HashMap;

#[derive(Default)]
struct State {
    tasks: HashMap<TaskId, Task>,
    connections: HashMap<ConnectionId, Connection>,
    jobs: HashMap<JobId, Job>,
    logs: HashMap<JobLogId, JobLog>,
}

impl State {
    fn connection_of_log(&self, log: &JobLog) -> Option<ConnectionId> {
        let job = self.jobs.get(&log.job_id)?;
        let task = self.tasks.get(&job.task_id)?;
        Some(task.connection_id)
    }
}

/// Shared in-memory store. Cheap to clone; all clones see the same state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: std::sync::Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_connection(&self, conn: Connection) {
        self.state.lock().connections.insert(conn.id, conn);
    }

    pub fn upsert_task(&self, task: Task) {
        self.state.lock().tasks.insert(task.id, task);
    }

    /// Remove a task, cascading to its jobs and their logs.
    pub fn remove_task(&self, id: TaskId) {
        let mut state = self.state.lock();
        state.tasks.remove(&id);
        let job_ids: Vec<JobId> =
            state.jobs.values().filter(|j| j.task_id == id).map(|j| j.id).collect();
        for job_id in job_ids {
            state.jobs.remove(&job_id);
            state.logs.retain(|_, log| log.job_id != job_id);
        }
    }

    /// Jobs in a non-terminal status for one task, for invariant checks.
    pub fn active_jobs_for_task(&self, task: TaskId) -> Vec<Job> {
        self.state
            .lock()
            .jobs
            .values()
            .filter(|j| j.task_id == task && j.status.is_active())
            .cloned()
            .collect()
    }
}

impl TaskStore for MemoryStore {
    fn get(&self, id: TaskId) -> Result<Task, StoreError> {
        self.state.lock().tasks.get(&id).cloned().ok_or(StoreError::TaskNotFound(id))
    }

    fn list_all(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.state.lock().tasks.values().cloned().collect();
        tasks.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tasks)
    }
}

impl ConnectionStore for MemoryStore {
    fn get(&self, id: ConnectionId) -> Result<Connection, StoreError> {
        self.state.lock().connections.get(&id).cloned().ok_or(StoreError::ConnectionNotFound(id))
    }
}

impl JobStore for MemoryStore {
    fn create_job(&self, job: &Job) -> Result<(), StoreError> {
        self.state.lock().jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn update_job(&self, job: &Job) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if !state.jobs.contains_key(&job.id) {
            return Err(StoreError::JobNotFound(job.id));
        }
        state.jobs.insert(job.id, job.clone());
        Ok(())
    }

    fn get_job(&self, id: JobId) -> Result<Job, StoreError> {
        self.state.lock().jobs.get(&id).cloned().ok_or(StoreError::JobNotFound(id))
    }

    fn jobs_for_task(&self, task: TaskId) -> Result<Vec<Job>, StoreError> {
        let mut jobs: Vec<Job> = self
            .state
            .lock()
            .jobs
            .values()
            .filter(|j| j.task_id == task)
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.start_time);
        Ok(jobs)
    }

    fn delete_job(&self, id: JobId) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if state.jobs.remove(&id).is_none() {
            return Err(StoreError::JobNotFound(id));
        }
        state.logs.retain(|_, log| log.job_id != id);
        Ok(())
    }

    fn append_log(&self, log: &JobLog) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if !state.jobs.contains_key(&log.job_id) {
            return Err(StoreError::JobNotFound(log.job_id));
        }
        state.logs.insert(log.id, log.clone());
        Ok(())
    }

    fn logs_for_job(&self, job: JobId) -> Result<Vec<JobLog>, StoreError> {
        let mut logs: Vec<JobLog> = self
            .state
            .lock()
            .logs
            .values()
            .filter(|l| l.job_id == job)
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.time);
        Ok(logs)
    }

    fn count_logs_for_connection(&self, conn: ConnectionId) -> Result<u64, StoreError> {
        let state = self.state.lock();
        let count =
            state.logs.values().filter(|l| state.connection_of_log(l) == Some(conn)).count();
        Ok(count as u64)
    }

    fn list_old_logs_for_connection(
        &self,
        conn: ConnectionId,
        keep: u64,
    ) -> Result<Vec<JobLogId>, StoreError> {
        let state = self.state.lock();
        let mut logs: Vec<&JobLog> = state
            .logs
            .values()
            .filter(|l| state.connection_of_log(l) == Some(conn))
            .collect();
        if logs.len() as u64 <= keep {
            return Ok(Vec::new());
        }
        logs.sort_by_key(|l| (l.time, l.id));
        let excess = logs.len() - keep as usize;
        Ok(logs.into_iter().take(excess).map(|l| l.id).collect())
    }

    fn delete_logs(&self, ids: &[JobLogId]) -> Result<u64, StoreError> {
        let mut state = self.state.lock();
        let mut removed = 0;
        for id in ids {
            if state.logs.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
