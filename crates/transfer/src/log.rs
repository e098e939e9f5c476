// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-level event hook exposed to the engine.

use std::sync::Arc;

/// What happened to a file during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAction {
    /// File copied or updated.
    Transfer,
    Delete,
    /// File examined and found in sync.
    Check,
    Skip,
    Error,
}

sk_core::simple_display! {
    TransferAction {
        Transfer => "transfer",
        Delete => "delete",
        Check => "check",
        Skip => "skip",
        Error => "error",
    }
}

/// One file-level event emitted by a backend.
#[derive(Debug, Clone)]
pub struct TransferEvent {
    /// Relative file path, empty for whole-run messages.
    pub path: String,
    pub action: TransferAction,
    pub message: String,
}

impl TransferEvent {
    pub fn new(path: impl Into<String>, action: TransferAction, message: impl Into<String>) -> Self {
        Self { path: path.into(), action, message: message.into() }
    }
}

/// Callback the engine installs to receive [`TransferEvent`]s.
pub type LogSink = Arc<dyn Fn(TransferEvent) + Send + Sync>;
