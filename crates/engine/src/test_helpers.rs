// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::bus::EventBus;
use crate::runner::Runner;
use crate::sync::{ResolvedTask, SyncEngine};
use sk_core::{
    Connection, Direction, JobProgressEvent, SystemClock, Task, TransferProgressEvent,
};
use sk_storage::{JobStore, MemoryStore};
use sk_transfer::testing::{FailFs, Gate, GatedFs};
use sk_transfer::{ProviderFactory, RemoteFs, Remotes, TransferError};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// `provider = "gated"`: a local backend parked on the harness gate.
pub(crate) struct GatedProvider {
    gate: Arc<Gate>,
}

impl ProviderFactory for GatedProvider {
    fn provider(&self) -> &str {
        "gated"
    }

    fn open(&self, conn: &Connection, remote_path: &str) -> Result<Arc<dyn RemoteFs>, TransferError> {
        let inner = sk_transfer::LocalProvider.open(conn, remote_path)?;
        Ok(Arc::new(GatedFs::new(inner, Arc::clone(&self.gate))))
    }
}

/// `provider = "fail"`: every sync fails.
pub(crate) struct FailProvider;

impl ProviderFactory for FailProvider {
    fn provider(&self) -> &str {
        "fail"
    }

    fn open(&self, _conn: &Connection, _remote_path: &str) -> Result<Arc<dyn RemoteFs>, TransferError> {
        Ok(Arc::new(FailFs::new("injected backend failure")))
    }
}

/// `provider = "panic"`: every sync panics mid-dispatch.
pub(crate) struct PanicProvider;

struct PanicFs;

#[async_trait::async_trait]
impl RemoteFs for PanicFs {
    async fn sync_from_local(
        &self,
        _ctx: &sk_transfer::SyncContext,
        _local: &std::path::Path,
    ) -> Result<(), TransferError> {
        panic!("backend blew up")
    }

    async fn sync_to_local(
        &self,
        _ctx: &sk_transfer::SyncContext,
        _local: &std::path::Path,
    ) -> Result<(), TransferError> {
        panic!("backend blew up")
    }

    async fn bisync(
        &self,
        _ctx: &sk_transfer::SyncContext,
        _local: &std::path::Path,
        _conflict: sk_core::ConflictResolution,
    ) -> Result<(), TransferError> {
        panic!("backend blew up")
    }
}

impl ProviderFactory for PanicProvider {
    fn provider(&self) -> &str {
        "panic"
    }

    fn open(&self, _conn: &Connection, _remote_path: &str) -> Result<Arc<dyn RemoteFs>, TransferError> {
        Ok(Arc::new(PanicFs))
    }
}

pub(crate) struct Harness {
    pub store: MemoryStore,
    pub engine: Arc<SyncEngine<SystemClock>>,
    pub job_bus: Arc<EventBus<JobProgressEvent>>,
    pub transfer_bus: Arc<EventBus<TransferProgressEvent>>,
    pub gate: Arc<Gate>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(false, None)
    }

    pub fn with_auto_delete() -> Self {
        Self::build(true, None)
    }

    /// Harness whose engine persists through the given job store instead of
    /// the shared memory store.
    pub fn with_job_store(jobs: Arc<dyn JobStore>) -> Self {
        Self::build(false, Some(jobs))
    }

    fn build(auto_delete: bool, jobs: Option<Arc<dyn JobStore>>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let gate = Gate::new();

        let mut remotes = Remotes::new();
        remotes.register(Arc::new(GatedProvider { gate: Arc::clone(&gate) }));
        remotes.register(Arc::new(FailProvider));
        remotes.register(Arc::new(PanicProvider));

        let job_bus = Arc::new(EventBus::new(100));
        let transfer_bus = Arc::new(EventBus::new(100));
        let jobs = jobs.unwrap_or_else(|| Arc::new(store.clone()));
        let engine = Arc::new(SyncEngine::new(
            jobs,
            Arc::new(remotes),
            Arc::clone(&job_bus),
            Arc::clone(&transfer_bus),
            auto_delete,
            Duration::from_millis(100),
            SystemClock,
        ));
        Self { store, engine, job_bus, transfer_bus, gate, dir }
    }

    pub fn runner(&self) -> Arc<Runner<SystemClock>> {
        Arc::new(Runner::new(Arc::clone(&self.engine), Arc::new(self.store.clone())))
    }

    fn connection_with_provider(&self, provider: &str) -> Connection {
        let mut config = HashMap::new();
        config.insert("root".to_string(), self.dir.path().join("remote").display().to_string());
        let conn = Connection::builder()
            .name(format!("{provider}-remote"))
            .provider(provider)
            .config(config)
            .build();
        self.store.upsert_connection(conn.clone());
        conn
    }

    pub fn local_connection(&self) -> Connection {
        self.connection_with_provider("local")
    }

    pub fn gated_connection(&self) -> Connection {
        self.connection_with_provider("gated")
    }

    pub fn failing_connection(&self) -> Connection {
        self.connection_with_provider("fail")
    }

    pub fn panicking_connection(&self) -> Connection {
        self.connection_with_provider("panic")
    }

    /// A task with a freshly created source directory.
    pub fn task_for(&self, conn: &Connection) -> Task {
        let task = Task::builder()
            .source_path(self.dir.path().join(format!("source-{}", sk_core::TaskId::new().short())))
            .connection_id(conn.id)
            .direction(Direction::Upload)
            .build();
        std::fs::create_dir_all(&task.source_path).unwrap();
        self.store.upsert_task(task.clone());
        task
    }

    pub fn resolved(&self, task: &Task, conn: &Connection) -> ResolvedTask {
        ResolvedTask { task: task.clone(), connection: conn.clone() }
    }

    pub fn write_source(&self, task: &Task, rel: &str, contents: &str) {
        let path = task.source_path.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    /// Destination directory for the default task remote path.
    pub fn remote_data(&self) -> PathBuf {
        self.dir.path().join("remote").join("data")
    }
}
