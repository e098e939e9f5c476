// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job entity and status state machine.

use crate::ids::{JobId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a job.
///
/// Flows `Pending → Running → {Success, Failed, Cancelled}`; the terminal
/// statuses are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed | JobStatus::Cancelled)
    }

    /// Pending or Running.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        Running => "running",
        Success => "success",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// What caused a job to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    Manual,
    Schedule,
    Realtime,
}

crate::simple_display! {
    Trigger {
        Manual => "manual",
        Schedule => "schedule",
        Realtime => "realtime",
    }
}

/// Aggregate transfer counters persisted with the job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounters {
    pub files_transferred: u64,
    pub bytes_transferred: u64,
    pub files_deleted: u64,
    pub error_count: u64,
}

/// Attempted an illegal status transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal job transition {from} -> {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// One execution of a task — the persisted unit of observability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub task_id: TaskId,
    pub status: JobStatus,
    pub trigger: Trigger,
    pub start_time: DateTime<Utc>,
    /// Set exactly when the status becomes terminal.
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub counters: JobCounters,
    /// Error text for failed or cancelled jobs.
    pub errors: Option<String>,
}

impl Job {
    /// Create a pending job for one run of `task_id`.
    pub fn new(task_id: TaskId, trigger: Trigger, start_time: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            task_id,
            status: JobStatus::Pending,
            trigger,
            start_time,
            end_time: None,
            counters: JobCounters::default(),
            errors: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Pending → Running.
    pub fn mark_running(&mut self) -> Result<(), TransitionError> {
        match self.status {
            JobStatus::Pending => {
                self.status = JobStatus::Running;
                Ok(())
            }
            from => Err(TransitionError { from, to: JobStatus::Running }),
        }
    }

    /// Transition to a terminal status, setting `end_time`.
    ///
    /// Rejects non-terminal targets and any attempt to leave a terminal
    /// status: transitions are write-once.
    pub fn finalize(
        &mut self,
        status: JobStatus,
        end_time: DateTime<Utc>,
        errors: Option<String>,
    ) -> Result<(), TransitionError> {
        if !status.is_terminal() || self.status.is_terminal() {
            return Err(TransitionError { from: self.status, to: status });
        }
        self.status = status;
        self.end_time = Some(end_time);
        self.errors = errors;
        Ok(())
    }

    /// True for a successful job that moved nothing.
    pub fn is_empty_success(&self) -> bool {
        self.status == JobStatus::Success
            && self.counters.files_transferred == 0
            && self.counters.bytes_transferred == 0
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        set {
            task_id: TaskId = TaskId::new(),
            status: JobStatus = JobStatus::Pending,
            trigger: Trigger = Trigger::Manual,
            counters: JobCounters = JobCounters::default(),
            start_time: DateTime<Utc> = Utc::now(),
        }
        option {
            end_time: DateTime<Utc> = None,
            errors: String = None,
        }
        computed {
            id: JobId = JobId::new(),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
