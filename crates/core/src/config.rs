// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration read by the core.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Minimum severity for a logger.
///
/// Keys in the `levels` map are case-sensitive logger names; values parse
/// case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

crate::simple_display! {
    LogLevel {
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Error => "error",
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::InvalidLevel(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown log level: {0}")]
    InvalidLevel(String),
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// `[job]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Delete successful jobs that transferred nothing.
    pub auto_delete_empty_jobs: bool,
}

/// `[log]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Retention cap per connection; 0 disables trimming.
    pub max_logs_per_connection: u64,
    /// Cron schedule for the retention sweep.
    pub cleanup_schedule: String,
    /// Global minimum level.
    pub level: LogLevel,
    /// Per-logger overrides, hierarchical by dotted name.
    pub levels: BTreeMap<String, LogLevel>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            max_logs_per_connection: 1000,
            cleanup_schedule: "0 * * * *".to_string(),
            level: LogLevel::Info,
            levels: BTreeMap::new(),
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub job: JobSettings,
    pub log: LogSettings,
}

impl Settings {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }
}

/// Hierarchical log-level resolver.
///
/// `a.b.c` resolves by exact match, then `a.b`, then `a`, then the global
/// level. Lookups are memoised; the key space is bounded by the set of
/// logger names used in code.
pub struct LogLevels {
    global: LogLevel,
    levels: BTreeMap<String, LogLevel>,
    cache: Mutex<HashMap<String, LogLevel>>,
}

impl LogLevels {
    pub fn new(settings: &LogSettings) -> Self {
        Self {
            global: settings.level,
            levels: settings.levels.clone(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Minimum level for the named logger.
    pub fn resolve(&self, logger: &str) -> LogLevel {
        if let Some(level) = self.cache.lock().get(logger) {
            return *level;
        }
        let level = self.resolve_uncached(logger);
        self.cache.lock().insert(logger.to_string(), level);
        level
    }

    fn resolve_uncached(&self, logger: &str) -> LogLevel {
        let mut name = logger;
        loop {
            if let Some(level) = self.levels.get(name) {
                return *level;
            }
            match name.rfind('.') {
                Some(idx) => name = &name[..idx],
                None => return self.global,
            }
        }
    }

    /// Whether a record at `level` from `logger` should be emitted.
    pub fn enabled(&self, logger: &str, level: LogLevel) -> bool {
        level >= self.resolve(logger)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
