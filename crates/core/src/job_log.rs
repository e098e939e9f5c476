// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-file job log lines.

use crate::ids::{JobId, JobLogId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a job log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

crate::simple_display! {
    LogLevel {
        Info => "info",
        Warn => "warn",
        Error => "error",
    }
}

/// One file-level event recorded during a job run.
///
/// Append-only while the job runs; removed by cascade delete or retention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobLog {
    pub id: JobLogId,
    pub job_id: JobId,
    pub time: DateTime<Utc>,
    pub level: LogLevel,
    /// Relative file path, empty for whole-run messages.
    pub path: String,
    pub message: String,
}

impl JobLog {
    pub fn new(
        job_id: JobId,
        time: DateTime<Utc>,
        level: LogLevel,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { id: JobLogId::new(), job_id, time, level, path: path.into(), message: message.into() }
    }
}
