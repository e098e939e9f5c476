// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run transfer accounting.
//!
//! Every run owns a fresh `TransferStats`; the progress sampler reads it
//! concurrently while a backend writes to it.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of one active file transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    pub name: String,
    pub size: u64,
    pub bytes: u64,
}

/// Aggregate counters plus the in-flight transfer list for one run.
///
/// Counters use relaxed atomics; the in-flight list is read and written
/// under its own mutex so snapshots are consistent at a point in time.
#[derive(Debug, Default)]
pub struct TransferStats {
    transfers: AtomicU64,
    bytes: AtomicU64,
    deletes: AtomicU64,
    errors: AtomicU64,
    total_transfers: AtomicU64,
    total_bytes: AtomicU64,
    in_flight: Mutex<Vec<InFlight>>,
}

impl TransferStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow the accumulating totals as the scan discovers work.
    pub fn add_totals(&self, files: u64, bytes: u64) {
        self.total_transfers.fetch_add(files, Ordering::Relaxed);
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Register a file as in flight.
    pub fn start_file(&self, name: &str, size: u64) {
        let mut in_flight = self.in_flight.lock();
        in_flight.push(InFlight { name: name.to_string(), size, bytes: 0 });
    }

    /// Record `delta` more bytes copied for an in-flight file.
    pub fn progress_file(&self, name: &str, delta: u64) {
        self.bytes.fetch_add(delta, Ordering::Relaxed);
        let mut in_flight = self.in_flight.lock();
        if let Some(entry) = in_flight.iter_mut().find(|e| e.name == name) {
            entry.bytes += delta;
        }
    }

    /// Remove a file from the in-flight list and count it transferred.
    pub fn finish_file(&self, name: &str) {
        self.transfers.fetch_add(1, Ordering::Relaxed);
        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|e| e.name != name);
    }

    /// Drop a file from the in-flight list without counting it.
    pub fn abort_file(&self, name: &str) {
        let mut in_flight = self.in_flight.lock();
        in_flight.retain(|e| e.name != name);
    }

    pub fn add_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transfers(&self) -> u64 {
        self.transfers.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn total_transfers(&self) -> u64 {
        self.total_transfers.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    /// Point-in-time snapshot of active transfers.
    pub fn in_flight(&self) -> Vec<InFlight> {
        self.in_flight.lock().clone()
    }
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
