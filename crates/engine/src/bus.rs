// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed pub/sub with filters and bounded per-subscriber buffers.
//!
//! Publish never blocks: a subscriber whose buffer is full loses the event,
//! other subscribers are unaffected.

use parking_lot::RwLock;
use sk_core::{EventFilter, SubscriberId};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Buffer capacity used when none is given.
pub const DEFAULT_BUFFER: usize = 100;

struct SubscriberEntry<T> {
    filter: Option<EventFilter<T>>,
    tx: mpsc::Sender<T>,
}

/// A live subscription. Dropping the receiver without unsubscribing is
/// tolerated; the bus prunes closed channels on the next publish.
pub struct Subscription<T> {
    pub id: SubscriberId,
    pub rx: mpsc::Receiver<T>,
}

/// Generic typed event bus.
pub struct EventBus<T> {
    subscribers: RwLock<HashMap<SubscriberId, SubscriberEntry<T>>>,
    capacity: usize,
}

impl<T: Clone + Send + 'static> EventBus<T> {
    /// `capacity == 0` selects [`DEFAULT_BUFFER`].
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 { DEFAULT_BUFFER } else { capacity };
        Self { subscribers: RwLock::new(HashMap::new()), capacity }
    }

    /// Register a subscriber; `filter == None` receives everything.
    pub fn subscribe(&self, filter: Option<EventFilter<T>>) -> Subscription<T> {
        let id = SubscriberId::new();
        let (tx, rx) = mpsc::channel(self.capacity);
        self.subscribers.write().insert(id, SubscriberEntry { filter, tx });
        Subscription { id, rx }
    }

    /// Remove a subscriber and close its channel. Idempotent.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().remove(&id);
    }

    /// Deliver an event to every matching subscriber without blocking.
    pub fn publish(&self, event: &T) {
        let mut closed = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for (id, entry) in subscribers.iter() {
                if let Some(filter) = &entry.filter {
                    if !filter(event) {
                        continue;
                    }
                }
                match entry.tx.try_send(event.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::trace!(subscriber = %id, "subscriber buffer full, dropping event");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }
        if !closed.is_empty() {
            let mut subscribers = self.subscribers.write();
            for id in closed {
                subscribers.remove(&id);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Drop every subscriber, closing their channels.
    pub fn close(&self) {
        self.subscribers.write().clear();
    }
}

impl<T: Clone + Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
