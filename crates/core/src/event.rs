// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle events published on the daemon's event bus.
//!
//! Serializes with `{"type": "job:name", ...fields}` format. Every
//! subscriber observes a given job's events in the order the supervisor
//! produced them; there is no cross-job ordering.

use crate::job::JobType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which capture stream a chunk of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

crate::simple_display! {
    OutputStream {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// Events that observers can subscribe to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "job:created")]
    JobCreated {
        id: String,
        name: String,
        kind: JobType,
        created_at: DateTime<Utc>,
    },

    #[serde(rename = "job:started")]
    JobStarted { id: String, pid: u32 },

    /// A chunk of captured child output.
    #[serde(rename = "job:output")]
    JobOutput {
        id: String,
        stream: OutputStream,
        chunk: String,
    },

    #[serde(rename = "job:completed")]
    JobCompleted { id: String, exit_code: i32 },

    #[serde(rename = "job:failed")]
    JobFailed {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    #[serde(rename = "job:killed")]
    JobKilled {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signal: Option<i32>,
    },

    #[serde(rename = "job:paused")]
    JobPaused { id: String },

    #[serde(rename = "job:resumed")]
    JobResumed { id: String },

    #[serde(rename = "job:removed")]
    JobRemoved { id: String },

    /// Emitted by the scheduler when a scheduled job reaches its fire time.
    #[serde(rename = "job:due")]
    JobDue {
        id: String,
        name: String,
        at_epoch_ms: u64,
    },
}

impl Event {
    /// The job this event concerns.
    pub fn job_id(&self) -> &str {
        match self {
            Event::JobCreated { id, .. }
            | Event::JobStarted { id, .. }
            | Event::JobOutput { id, .. }
            | Event::JobCompleted { id, .. }
            | Event::JobFailed { id, .. }
            | Event::JobKilled { id, .. }
            | Event::JobPaused { id }
            | Event::JobResumed { id }
            | Event::JobRemoved { id }
            | Event::JobDue { id, .. } => id,
        }
    }

    /// One-line summary for daemon logs.
    pub fn log_summary(&self) -> String {
        match self {
            Event::JobCreated { id, name, kind, .. } => {
                format!("job:created id={id} name={name} type={kind}")
            }
            Event::JobStarted { id, pid } => format!("job:started id={id} pid={pid}"),
            Event::JobOutput { id, stream, chunk } => {
                format!("job:output id={id} stream={stream} bytes={}", chunk.len())
            }
            Event::JobCompleted { id, exit_code } => {
                format!("job:completed id={id} exit_code={exit_code}")
            }
            Event::JobFailed { id, exit_code, .. } => {
                format!("job:failed id={id} exit_code={exit_code:?}")
            }
            Event::JobKilled { id, signal } => format!("job:killed id={id} signal={signal:?}"),
            Event::JobPaused { id } => format!("job:paused id={id}"),
            Event::JobResumed { id } => format!("job:resumed id={id}"),
            Event::JobRemoved { id } => format!("job:removed id={id}"),
            Event::JobDue { id, at_epoch_ms, .. } => {
                format!("job:due id={id} at={at_epoch_ms}")
            }
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
