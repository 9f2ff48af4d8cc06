// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job record and state machine.
//!
//! A [`Job`] is plain data: everything here serializes to the snapshot
//! file. Live process handles and timers are owned by the daemon's
//! supervisor and keyed by job id, never embedded in the record.

use crate::cron::CronExpr;
use crate::error::JobError;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Nice-style priority bounds, inclusive.
pub const PRIORITY_MIN: i32 = -20;
pub const PRIORITY_MAX: i32 = 19;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    Running,
    Paused,
    Stopped,
    Completed,
    Failed,
    Killed,
}

crate::simple_display! {
    JobStatus {
        Created => "created",
        Running => "running",
        Paused => "paused",
        Stopped => "stopped",
        Completed => "completed",
        Failed => "failed",
        Killed => "killed",
    }
}

impl JobStatus {
    /// Terminal statuses never transition anywhere except removal.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Killed)
    }

    /// A live job owns an OS process handle.
    pub fn is_live(self) -> bool {
        matches!(self, JobStatus::Running | JobStatus::Paused)
    }

    /// Legal status transitions.
    ///
    /// `created → running | killed`, `running → paused | stopped |
    /// completed | failed | killed`, `paused → running | stopped | killed`,
    /// `stopped → running` (restart). Terminal statuses admit nothing.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Created, Running)
                | (Created, Killed)
                | (Running, Paused)
                | (Running, Stopped)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Killed)
                | (Paused, Running)
                | (Paused, Stopped)
                | (Paused, Killed)
                | (Stopped, Running)
        )
    }

    /// Whether a job in this status may be removed without force.
    pub fn can_remove(self) -> bool {
        self.is_terminal() || self == JobStatus::Created
    }
}

/// How a job's command is turned into an OS process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Route the command string through the system shell (`$SHELL -c`).
    #[default]
    Shell,
    /// Spawn the tokenized command directly, no shell in between.
    System,
    /// A shell job driven by a cron/interval schedule.
    Scheduled,
    /// A long-lived shell job expected to run until stopped.
    Service,
}

crate::simple_display! {
    JobType {
        Shell => "shell",
        System => "system",
        Scheduled => "scheduled",
        Service => "service",
    }
}

/// When a job should fire.
///
/// `cron` is the source of truth when set; otherwise `interval_ms` drives
/// rescheduling. `next_run` seeds the first fire time for interval jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cron: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
}

impl Schedule {
    pub fn cron(expr: impl Into<String>) -> Self {
        Self { cron: Some(expr.into()), ..Default::default() }
    }

    pub fn interval(ms: u64) -> Self {
        Self { interval_ms: Some(ms), ..Default::default() }
    }

    /// A schedule with neither cron nor interval never enters the scheduler.
    pub fn is_empty(&self) -> bool {
        self.cron.is_none() && self.interval_ms.is_none()
    }

    /// Validate the cron expression, if any.
    pub fn validate(&self) -> Result<(), JobError> {
        if let Some(expr) = &self.cron {
            CronExpr::parse(expr)?;
        }
        Ok(())
    }
}

/// A managed unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub argv: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: JobType,
    pub cwd: PathBuf,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ppid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub tags: IndexSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cpu: Option<u32>,
}

impl Job {
    /// Materialize a job from a validated spec. Call [`JobSpec::validate`] first.
    pub fn from_spec(spec: JobSpec, id: String, created_at: DateTime<Utc>) -> Self {
        let name = spec.name.unwrap_or_else(|| id.clone());
        Self {
            id,
            name,
            command: spec.command,
            argv: spec.argv,
            kind: spec.kind,
            cwd: spec.cwd.unwrap_or_default(),
            env: spec.env,
            user: spec.user.unwrap_or_default(),
            schedule: spec.schedule,
            priority: spec.priority,
            timeout_ms: spec.timeout_ms,
            status: JobStatus::Created,
            created_at,
            started_at: None,
            completed_at: None,
            pid: None,
            ppid: None,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            log_file: spec.log_file,
            tags: spec.tags,
            description: spec.description,
            max_memory: spec.max_memory,
            max_cpu: spec.max_cpu,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether this job participates in the scheduler heap.
    pub fn is_scheduled(&self) -> bool {
        self.schedule.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// Request to create a new job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub argv: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: JobType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub tags: IndexSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cpu: Option<u32>,
}

impl JobSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), ..Default::default() }
    }

    crate::setters! {
        set {
            kind: JobType,
            argv: Vec<String>,
            env: HashMap<String, String>,
            tags: IndexSet<String>,
        }
        option {
            id: String,
            name: String,
            cwd: PathBuf,
            user: String,
            schedule: Schedule,
            priority: i32,
            timeout_ms: u64,
            log_file: PathBuf,
            description: String,
        }
    }

    /// Reject specs that can never spawn or schedule correctly.
    ///
    /// Cron expressions and priority ranges fail here, at creation time,
    /// never at fire time.
    pub fn validate(&self) -> Result<(), JobError> {
        if self.command.trim().is_empty() {
            return Err(JobError::InvalidSpec("command must not be empty".into()));
        }
        if let Some(p) = self.priority {
            if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&p) {
                return Err(JobError::InvalidSpec(format!(
                    "priority {p} outside [{PRIORITY_MIN}, {PRIORITY_MAX}]"
                )));
            }
        }
        if let Some(schedule) = &self.schedule {
            schedule.validate()?;
        }
        Ok(())
    }
}

/// Patch applied by `update`: mutable metadata only.
///
/// Status, pid, captures, and timestamps are owned by the lifecycle paths
/// and cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cpu: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<IndexSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        self == &JobPatch::default()
    }

    /// Apply this patch to a job. Out-of-range priorities are clamped;
    /// cron expressions are validated before anything is touched.
    pub fn apply(&self, job: &mut Job) -> Result<(), JobError> {
        if let Some(schedule) = &self.schedule {
            schedule.validate()?;
        }
        if let Some(name) = &self.name {
            job.name.clone_from(name);
        }
        if let Some(p) = self.priority {
            job.priority = Some(p.clamp(PRIORITY_MIN, PRIORITY_MAX));
        }
        if let Some(m) = self.max_memory {
            job.max_memory = Some(m);
        }
        if let Some(c) = self.max_cpu {
            job.max_cpu = Some(c);
        }
        if let Some(t) = self.timeout_ms {
            job.timeout_ms = Some(t);
        }
        if let Some(tags) = &self.tags {
            job.tags.clone_from(tags);
        }
        if let Some(d) = &self.description {
            job.description = Some(d.clone());
        }
        if let Some(schedule) = &self.schedule {
            job.schedule = Some(schedule.clone());
        }
        Ok(())
    }
}

/// Extras recorded atomically with a status transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusChange {
    pub pid: Option<u32>,
    pub ppid: Option<u32>,
    pub exit_code: Option<i32>,
    /// Signal that terminated the child, when it did not exit normally.
    pub signal: Option<i32>,
}

impl StatusChange {
    pub fn started(pid: u32, ppid: u32) -> Self {
        Self { pid: Some(pid), ppid: Some(ppid), ..Default::default() }
    }

    pub fn exited(exit_code: Option<i32>, signal: Option<i32>) -> Self {
        Self { exit_code, signal, ..Default::default() }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
