// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler counters and gauges, surfaced through the `Stats` query.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Snapshot of scheduler health.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerMetrics {
    /// Jobs currently in the heap.
    pub jobs_scheduled: usize,
    /// Due jobs emitted by the most recent tick.
    pub due_last_tick: usize,
    pub total_ticks: u64,
    pub total_fired: u64,
    /// Exponential moving average of tick duration.
    pub avg_tick_micros: u64,
    /// Rough heap footprint.
    pub memory_estimate_bytes: usize,
}

impl SchedulerMetrics {
    pub(crate) fn record_tick(&mut self, due: usize, took: Duration, heap_len: usize) {
        let micros = took.as_micros() as u64;
        self.total_ticks += 1;
        self.total_fired += due as u64;
        self.due_last_tick = due;
        self.avg_tick_micros = if self.total_ticks == 1 {
            micros
        } else {
            (self.avg_tick_micros * 7 + micros) / 8
        };
        self.record_heap(heap_len);
    }

    pub(crate) fn record_heap(&mut self, heap_len: usize) {
        self.jobs_scheduled = heap_len;
        self.memory_estimate_bytes =
            heap_len * (std::mem::size_of::<super::heap::Entry>() + std::mem::size_of::<usize>());
    }
}
