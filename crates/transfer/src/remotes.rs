// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry materialising connection rows as named remotes.

use crate::error::TransferError;
use crate::fs::RemoteFs;
use crate::local::LocalProvider;
use parking_lot::Mutex;
use sk_core::{Connection, ConnectionId};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a [`RemoteFs`] for connections of one provider type.
pub trait ProviderFactory: Send + Sync {
    /// Provider name this factory serves (matches `Connection::provider`).
    fn provider(&self) -> &str;

    /// Bind a remote for the connection at the given remote path.
    fn open(&self, conn: &Connection, remote_path: &str) -> Result<Arc<dyn RemoteFs>, TransferError>;
}

/// Named-remote registry.
///
/// Connections are materialised lazily on first use and cached per
/// `(connection, remote_path)`; a connection mutation invalidates its entry.
pub struct Remotes {
    factories: HashMap<String, Arc<dyn ProviderFactory>>,
    cache: Mutex<HashMap<(ConnectionId, String), Arc<dyn RemoteFs>>>,
}

impl Remotes {
    /// Registry with the built-in local provider.
    pub fn new() -> Self {
        let mut remotes =
            Self { factories: HashMap::new(), cache: Mutex::new(HashMap::new()) };
        remotes.register(Arc::new(LocalProvider));
        remotes
    }

    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories.insert(factory.provider().to_string(), factory);
    }

    /// Resolve a remote for `conn` at `remote_path`.
    pub fn open(
        &self,
        conn: &Connection,
        remote_path: &str,
    ) -> Result<Arc<dyn RemoteFs>, TransferError> {
        let key = (conn.id, remote_path.to_string());
        if let Some(fs) = self.cache.lock().get(&key) {
            return Ok(Arc::clone(fs));
        }
        let factory = self
            .factories
            .get(&conn.provider)
            .ok_or_else(|| TransferError::UnknownProvider(conn.provider.clone()))?;
        let fs = factory.open(conn, remote_path)?;
        self.cache.lock().insert(key, Arc::clone(&fs));
        Ok(fs)
    }

    /// Drop cached remotes for a mutated or deleted connection.
    pub fn invalidate(&self, conn: ConnectionId) {
        self.cache.lock().retain(|(id, _), _| *id != conn);
    }
}

impl Default for Remotes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "remotes_tests.rs"]
mod tests;
