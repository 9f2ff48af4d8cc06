// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for daemon unit tests.

use crate::daemon::{DaemonCtx, Phase};
use crate::event_bus::EventBus;
use crate::scheduler::{spawn_scheduler, Due};
use crate::store::JobStore;
use crate::supervisor::Supervisor;
use lsh_core::SystemClock;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};

/// A ready daemon context with no listener attached. The due receiver is
/// returned so scheduler emissions can be observed (or kept alive).
pub(crate) fn ready_ctx() -> (Arc<DaemonCtx>, mpsc::Receiver<Due>) {
    let events = EventBus::new();
    let store = JobStore::new(events.clone());
    let supervisor = Supervisor::new(Arc::clone(&store));
    let (due_tx, due_rx) = mpsc::channel(64);
    let scheduler = spawn_scheduler(SystemClock, due_tx);
    let (phase, _) = watch::channel(Phase::Ready);
    let ctx = Arc::new(DaemonCtx {
        store,
        supervisor,
        scheduler,
        events,
        phase,
        shutdown: Arc::new(Notify::new()),
    });
    (ctx, due_rx)
}
