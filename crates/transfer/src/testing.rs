// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test backends for exercising slow and failing transfers.

use crate::error::TransferError;
use crate::fs::{RemoteFs, SyncContext};
use async_trait::async_trait;
use sk_core::ConflictResolution;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Two-phase gate: a transfer signals that it started, then parks until the
/// test releases it (or the run is cancelled).
pub struct Gate {
    started: watch::Sender<u32>,
    release: watch::Sender<bool>,
    entered: AtomicU32,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        let (started, _) = watch::channel(0);
        let (release, _) = watch::channel(false);
        Arc::new(Self { started, release, entered: AtomicU32::new(0) })
    }

    /// Wait until at least `n` transfers have reached the gate.
    pub async fn wait_started(&self, n: u32) {
        let mut rx = self.started.subscribe();
        // A closed channel can only mean the gate was dropped mid-test.
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    /// Let all parked and future transfers proceed.
    pub fn release(&self) {
        let _ = self.release.send(true);
    }

    /// How many transfers have reached the gate.
    pub fn entered(&self) -> u32 {
        self.entered.load(Ordering::SeqCst)
    }

    async fn enter(&self, cancel: &CancellationToken) -> Result<(), TransferError> {
        let count = self.entered.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.started.send(count);
        let mut rx = self.release.subscribe();
        tokio::select! {
            _ = cancel.cancelled() => Err(TransferError::Cancelled),
            result = rx.wait_for(|released| *released) => {
                result.map_err(|_| TransferError::Cancelled)?;
                Ok(())
            }
        }
    }
}

/// Backend wrapper that parks every sync on a [`Gate`] before delegating.
pub struct GatedFs {
    inner: Arc<dyn RemoteFs>,
    gate: Arc<Gate>,
}

impl GatedFs {
    pub fn new(inner: Arc<dyn RemoteFs>, gate: Arc<Gate>) -> Self {
        Self { inner, gate }
    }
}

#[async_trait]
impl RemoteFs for GatedFs {
    async fn sync_from_local(&self, ctx: &SyncContext, local: &Path) -> Result<(), TransferError> {
        self.gate.enter(&ctx.cancel).await?;
        self.inner.sync_from_local(ctx, local).await
    }

    async fn sync_to_local(&self, ctx: &SyncContext, local: &Path) -> Result<(), TransferError> {
        self.gate.enter(&ctx.cancel).await?;
        self.inner.sync_to_local(ctx, local).await
    }

    async fn bisync(
        &self,
        ctx: &SyncContext,
        local: &Path,
        conflict: ConflictResolution,
    ) -> Result<(), TransferError> {
        self.gate.enter(&ctx.cancel).await?;
        self.inner.bisync(ctx, local, conflict).await
    }
}

/// Backend that always fails with the given message.
pub struct FailFs {
    message: String,
}

impl FailFs {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    fn error(&self) -> TransferError {
        TransferError::Config(self.message.clone())
    }
}

#[async_trait]
impl RemoteFs for FailFs {
    async fn sync_from_local(&self, _ctx: &SyncContext, _local: &Path) -> Result<(), TransferError> {
        Err(self.error())
    }

    async fn sync_to_local(&self, _ctx: &SyncContext, _local: &Path) -> Result<(), TransferError> {
        Err(self.error())
    }

    async fn bisync(
        &self,
        _ctx: &SyncContext,
        _local: &Path,
        _conflict: ConflictResolution,
    ) -> Result<(), TransferError> {
        Err(self.error())
    }
}
