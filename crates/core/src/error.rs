// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy surfaced by the job subsystem.

use crate::job::JobStatus;
use thiserror::Error;

/// Errors returned by client-facing job operations.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job not found: {0}")]
    NotFound(String),

    #[error("job {id} is {status}: {reason}")]
    InvalidState {
        id: String,
        status: JobStatus,
        reason: String,
    },

    #[error("invalid job spec: {0}")]
    InvalidSpec(String),

    #[error("failed to spawn `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("job {0} exceeded its timeout")]
    Timeout(String),
}

impl JobError {
    /// Stable machine-readable kind, carried across the IPC boundary.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::NotFound(_) => "not_found",
            JobError::InvalidState { .. } => "invalid_state",
            JobError::InvalidSpec(_) => "invalid_spec",
            JobError::SpawnFailed { .. } => "spawn_failed",
            JobError::Io(_) => "io",
            JobError::Unsupported(_) => "unsupported",
            JobError::Timeout(_) => "timeout",
        }
    }

    /// Shorthand for an illegal status transition.
    pub fn bad_transition(id: impl Into<String>, from: JobStatus, to: JobStatus) -> Self {
        JobError::InvalidState {
            id: id.into(),
            status: from,
            reason: format!("cannot transition to {to}"),
        }
    }
}

impl From<crate::cron::CronError> for JobError {
    fn from(e: crate::cron::CronError) -> Self {
        JobError::InvalidSpec(e.to_string())
    }
}
