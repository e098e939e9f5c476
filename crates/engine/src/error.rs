// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error kinds.

use sk_core::TaskValidationError;
use sk_storage::StoreError;
use sk_transfer::TransferError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid task, malformed cron, unknown connection. Never produces a job.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The run's context was cancelled.
    #[error("run cancelled")]
    Cancelled,

    /// Transfer-layer failure; the job is recorded as failed.
    #[error(transparent)]
    Transfer(TransferError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Cancelled)
    }
}

impl From<TaskValidationError> for EngineError {
    fn from(e: TaskValidationError) -> Self {
        EngineError::Precondition(e.to_string())
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
