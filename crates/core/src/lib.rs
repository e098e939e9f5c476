// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synckit core domain model.
//!
//! Entities (Task, Job, JobLog, Connection), progress event payloads,
//! configuration, and the clock abstraction shared by all crates.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod config;
pub mod connection;
pub mod event;
pub mod ids;
pub mod job;
pub mod job_log;
pub mod macros;
pub mod task;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{JobSettings, LogLevel as ConfigLogLevel, LogLevels, LogSettings, Settings};
pub use connection::Connection;
pub use event::{
    job_progress_filter, transfer_progress_filter, EventFilter, FileTransfer, JobProgressEvent,
    TransferProgressEvent,
};
pub use ids::{ConnectionId, JobId, JobLogId, RunId, SubscriberId, TaskId};
pub use job::{Job, JobCounters, JobStatus, TransitionError, Trigger};
pub use job_log::{JobLog, LogLevel};
pub use task::{ConflictResolution, Direction, SyncOptions, Task, TaskValidationError};
