// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lsh_core::{JobFilter, JobPatch, JobSpec};
use serde::{Deserialize, Serialize};

/// Request from a client to the daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Create a job from a spec
    CreateJob { spec: JobSpec },

    /// Start a created or stopped job
    StartJob { id: String },

    /// Signal a running job (default: soft terminate) and mark it stopped
    StopJob {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signal: Option<i32>,
    },

    /// Suspend a running job
    PauseJob { id: String },

    /// Continue a paused job
    ResumeJob { id: String },

    /// Hard-kill shorthand
    KillJob {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signal: Option<i32>,
    },

    /// List jobs matching a filter (empty filter = all)
    ListJobs {
        #[serde(default)]
        filter: JobFilter,
    },

    /// Fetch one job
    GetJob { id: String },

    /// Patch mutable metadata
    UpdateJob { id: String, patch: JobPatch },

    /// Remove a job record; `force` kills a live job first
    RemoveJob {
        id: String,
        #[serde(default)]
        force: bool,
    },

    /// Sample the job's live process
    MonitorJob { id: String },

    /// Best-effort enumeration of OS processes
    Processes,

    /// Remove terminal jobs older than the given age
    CleanupJobs { older_than_ms: u64 },

    /// Store and scheduler statistics
    Stats,

    /// Begin graceful shutdown
    Shutdown,
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
