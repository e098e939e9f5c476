// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync task definition.

use crate::ids::{ConnectionId, TaskId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Which way bytes move between the source path and the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Upload,
    Download,
    Bidirectional,
}

crate::simple_display! {
    Direction {
        Upload => "upload",
        Download => "download",
        Bidirectional => "bidirectional",
    }
}

/// How bidirectional sync settles a file that changed on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Keep the newer copy, rename the older one.
    Newer,
    /// Prefer the local copy, replacing the remote one.
    Local,
    /// Prefer the remote copy, replacing the local one.
    Remote,
    /// Keep both, suffixing the conflicting copy.
    Both,
}

crate::simple_display! {
    ConflictResolution {
        Newer => "newer",
        Local => "local",
        Remote => "remote",
        Both => "both",
    }
}

/// Sync options, consulted only for bidirectional tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    pub conflict_resolution: ConflictResolution,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { conflict_resolution: ConflictResolution::Newer }
    }
}

/// Validation failures for a task definition.
///
/// Surfaced synchronously before any job is created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskValidationError {
    #[error("task name is empty")]
    EmptyName,
    #[error("task source path is empty")]
    EmptySource,
}

/// A user-defined sync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Local filesystem side of the sync.
    pub source_path: PathBuf,
    pub connection_id: ConnectionId,
    /// Path on the remote, interpreted by the connection's backend.
    pub remote_path: String,
    pub direction: Direction,
    /// Cron expression (5 or 6 field); empty disables scheduling.
    #[serde(default)]
    pub schedule: String,
    /// Trigger on filesystem changes under `source_path`.
    #[serde(default)]
    pub realtime: bool,
    #[serde(default)]
    pub options: SyncOptions,
}

impl Task {
    pub fn has_schedule(&self) -> bool {
        !self.schedule.trim().is_empty()
    }

    /// Structural validation. Cron syntax is checked by the scheduler,
    /// which owns the expression format.
    pub fn validate(&self) -> Result<(), TaskValidationError> {
        if self.name.trim().is_empty() {
            return Err(TaskValidationError::EmptyName);
        }
        if self.source_path.as_os_str().is_empty() {
            return Err(TaskValidationError::EmptySource);
        }
        Ok(())
    }
}

crate::builder! {
    pub struct TaskBuilder => Task {
        into {
            name: String = "test-task",
            source_path: PathBuf = "/tmp/src",
            remote_path: String = "data",
            schedule: String = "",
        }
        set {
            direction: Direction = Direction::Upload,
            realtime: bool = false,
            options: SyncOptions = SyncOptions::default(),
            connection_id: ConnectionId = ConnectionId::new(),
        }
        computed {
            id: TaskId = TaskId::new(),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
