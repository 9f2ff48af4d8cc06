// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lsh-storage: snapshot persistence for the job daemon.
//!
//! The persisted artifact is a single JSON file holding the full job
//! array — not a write-ahead log. Writes go through a coalescing flusher
//! task so a burst of mutations serializes once.

mod flush;
mod snapshot;

pub use flush::{spawn_flusher, FlushHandle};
pub use snapshot::{SnapshotFile, StorageError};
