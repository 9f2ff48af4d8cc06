// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-coalescing flusher.
//!
//! Every mutation enqueues a flush token before returning to the caller;
//! the flusher drains pending tokens, takes one snapshot of the store,
//! and writes once. Write failures are logged and never propagate to the
//! mutating operation — in-memory state stays authoritative until the
//! next successful write. [`FlushHandle::flush_now`] is the barrier
//! variant used for the final flush on graceful shutdown.

use crate::snapshot::SnapshotFile;
use lsh_core::Job;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

/// Capacity is a backstop only: one queued token already guarantees a
/// future flush will observe the current state.
const FLUSH_QUEUE: usize = 64;

enum FlushMsg {
    /// Fire-and-forget write request.
    Write,
    /// Write, then acknowledge once the cycle finished.
    Barrier(oneshot::Sender<()>),
}

/// Handle used by the store to request a flush.
#[derive(Debug, Clone)]
pub struct FlushHandle {
    tx: mpsc::Sender<FlushMsg>,
}

impl FlushHandle {
    /// Request that the current store state be persisted.
    pub fn request(&self) {
        // A full queue means a flush is already pending.
        let _ = self.tx.try_send(FlushMsg::Write);
    }

    /// Persist the current store state and wait until the write cycle
    /// has run. A failed write is still logged, not returned — the
    /// durability policy is the same as for [`FlushHandle::request`].
    pub async fn flush_now(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(FlushMsg::Barrier(ack)).await.is_ok() {
            let _ = done.await;
        }
    }
}

/// Spawn the flusher task. `snapshot` must return the current job array.
pub fn spawn_flusher(
    file: SnapshotFile,
    snapshot: impl Fn() -> Vec<Job> + Send + Sync + 'static,
) -> FlushHandle {
    let (tx, mut rx) = mpsc::channel(FLUSH_QUEUE);
    tokio::spawn(async move {
        while let Some(first) = rx.recv().await {
            // Coalesce any requests that piled up behind this one,
            // collecting every barrier so all of them see this write.
            let mut barriers = Vec::new();
            let mut absorb = |msg: FlushMsg| {
                if let FlushMsg::Barrier(ack) = msg {
                    barriers.push(ack);
                }
            };
            absorb(first);
            while let Ok(msg) = rx.try_recv() {
                absorb(msg);
            }

            let jobs = snapshot();
            match file.save(&jobs) {
                Ok(()) => {
                    debug!(jobs = jobs.len(), path = %file.path().display(), "snapshot flushed")
                }
                Err(e) => {
                    warn!(path = %file.path().display(), error = %e, "snapshot flush failed")
                }
            }
            for ack in barriers {
                let _ = ack.send(());
            }
        }
    });
    FlushHandle { tx }
}

#[cfg(test)]
#[path = "flush_tests.rs"]
mod tests;
