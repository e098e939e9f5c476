// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The backend seam driven by the sync engine.

use crate::error::TransferError;
use crate::log::{LogSink, TransferEvent};
use crate::stats::TransferStats;
use async_trait::async_trait;
use sk_core::ConflictResolution;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Per-run context handed to a backend: cancellation, accounting, and the
/// file-level event sink.
#[derive(Clone)]
pub struct SyncContext {
    pub cancel: CancellationToken,
    pub stats: Arc<TransferStats>,
    pub log: Option<LogSink>,
}

impl SyncContext {
    pub fn new(cancel: CancellationToken, stats: Arc<TransferStats>, log: Option<LogSink>) -> Self {
        Self { cancel, stats, log }
    }

    pub fn emit(&self, event: TransferEvent) {
        if let Some(sink) = &self.log {
            sink(event);
        }
    }

    pub fn check_cancelled(&self) -> Result<(), TransferError> {
        if self.cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        Ok(())
    }
}

/// A named remote bound to a path, able to sync against a local directory.
///
/// Instances are produced by [`crate::Remotes`] from a connection row and a
/// task's remote path. Each call is one blocking sync; cancellation arrives
/// through the context.
#[async_trait]
pub trait RemoteFs: Send + Sync {
    /// Copy the local tree to the remote.
    async fn sync_from_local(&self, ctx: &SyncContext, local: &Path) -> Result<(), TransferError>;

    /// Copy the remote tree to the local path.
    async fn sync_to_local(&self, ctx: &SyncContext, local: &Path) -> Result<(), TransferError>;

    /// Bidirectional sync between the local tree and the remote.
    async fn bisync(
        &self,
        ctx: &SyncContext,
        local: &Path,
        conflict: ConflictResolution,
    ) -> Result<(), TransferError>;
}

impl std::fmt::Debug for dyn RemoteFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<dyn RemoteFs>")
    }
}
