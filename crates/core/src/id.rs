// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Monotonic job id generation.
//!
//! Ids are `job_<N>` with N strictly increasing for the lifetime of the
//! process. After a snapshot load the counter is advanced past the highest
//! numeric id observed, so new jobs never collide with loaded ones.

use std::sync::atomic::{AtomicU64, Ordering};

const PREFIX: &str = "job_";

/// Generator of `job_<N>` identifiers.
#[derive(Debug)]
pub struct JobIdGen {
    next: AtomicU64,
}

impl Default for JobIdGen {
    fn default() -> Self {
        Self::new()
    }
}

impl JobIdGen {
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }

    /// Hand out the next id. N is never reused within a process lifetime.
    pub fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{PREFIX}{n}")
    }

    /// Ensure future ids sort after `id`, if it carries a numeric suffix.
    /// Foreign id shapes are ignored.
    pub fn advance_past(&self, id: &str) {
        let Some(n) = id.strip_prefix(PREFIX).and_then(|s| s.parse::<u64>().ok()) else {
            return;
        };
        self.next.fetch_max(n + 1, Ordering::Relaxed);
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
