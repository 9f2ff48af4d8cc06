// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast bus for lifecycle events.
//!
//! Every subscriber gets its own channel; a slow subscriber lags and
//! drops events rather than blocking producers. Per-job ordering follows
//! emission order, which the supervisor guarantees for its job.

use lsh_core::Event;
use tokio::sync::broadcast;
use tracing::debug;

const BUS_CAPACITY: usize = 1024;

/// Cloneable handle to the event bus.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Publish an event. With no subscribers this is a no-op.
    pub fn emit(&self, event: Event) {
        debug!("{}", event.log_summary());
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
