// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixtures shared by this crate's tests and (via the `test-support`
//! feature) by dependent crates' tests.

use crate::job::{Job, JobSpec, JobStatus, JobType, Schedule};
use chrono::{DateTime, Utc};

/// Every status, for exhaustive transition checks.
pub fn all_statuses() -> [JobStatus; 7] {
    [
        JobStatus::Created,
        JobStatus::Running,
        JobStatus::Paused,
        JobStatus::Stopped,
        JobStatus::Completed,
        JobStatus::Failed,
        JobStatus::Killed,
    ]
}

/// A freshly-created shell job with a fixed creation time.
pub fn job(id: &str) -> Job {
    // 2026-01-01T12:00:00Z
    let created_at = DateTime::from_timestamp_millis(1_767_268_800_000).unwrap_or_else(Utc::now);
    Job::from_spec(JobSpec::new("echo hello").name(id), id.to_string(), created_at)
}

/// A job carrying an interval schedule.
pub fn interval_job(id: &str, interval_ms: u64) -> Job {
    let mut j = job(id);
    j.kind = JobType::Scheduled;
    j.schedule = Some(Schedule::interval(interval_ms));
    j
}

/// A job carrying a cron schedule.
pub fn cron_job(id: &str, expr: &str) -> Job {
    let mut j = job(id);
    j.kind = JobType::Scheduled;
    j.schedule = Some(Schedule::cron(expr));
    j
}
