// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::monitor::{ProcessInfo, ProcessSample};
use crate::scheduler::SchedulerMetrics;
use crate::store::StoreStats;
use lsh_core::{Job, JobError};
use serde::{Deserialize, Serialize};

/// Combined statistics for the `Stats` request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaemonStats {
    pub store: StoreStats,
    pub scheduler: SchedulerMetrics,
}

/// Response from the daemon to a client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Pong,

    Job { job: Job },

    Jobs { jobs: Vec<Job> },

    Removed { removed: bool },

    /// `None` once the process has exited.
    Sample { sample: Option<ProcessSample> },

    Processes { processes: Vec<ProcessInfo> },

    Count { count: usize },

    Stats { stats: DaemonStats },

    ShuttingDown,

    /// Typed error; `kind` mirrors the error taxonomy.
    Error { kind: String, message: String },
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

impl From<JobError> for Response {
    fn from(e: JobError) -> Self {
        Response::Error { kind: e.kind().to_string(), message: e.to_string() }
    }
}
