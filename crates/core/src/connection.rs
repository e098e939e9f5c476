// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named remote connection configuration.

use crate::ids::ConnectionId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A configured handle to a remote backend of the transfer layer.
///
/// The core reads connections to materialise remotes; it never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    /// Unique human-readable name, doubles as the remote name.
    pub name: String,
    /// Which backend handles this connection (e.g. "local").
    pub provider: String,
    /// Opaque provider options (credentials, roots, flags).
    #[serde(default)]
    pub config: HashMap<String, String>,
}

impl Connection {
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }
}

crate::builder! {
    pub struct ConnectionBuilder => Connection {
        into {
            name: String = "test-remote",
            provider: String = "local",
        }
        set {
            config: HashMap<String, String> = HashMap::new(),
        }
        computed {
            id: ConnectionId = ConnectionId::new(),
        }
    }
}
