// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job store: sole owner of the job map.
//!
//! Mutations are serialized behind the write lock and each one emits its
//! lifecycle event and requests a persistence flush before returning, so
//! the snapshot file trails the store by at most one in-flight write.
//! Reads run concurrently on the read lock.

use crate::event_bus::EventBus;
use chrono::{DateTime, Utc};
use lsh_core::{
    Event, Job, JobError, JobFilter, JobIdGen, JobPatch, JobSpec, JobStatus, OutputStream,
    StatusChange,
};
use lsh_storage::FlushHandle;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

/// Soft bound on each capture buffer; bytes past it only reach `log_file`.
pub const CAPTURE_LIMIT: usize = 1024 * 1024;

/// Marker appended once when a capture buffer hits [`CAPTURE_LIMIT`].
pub const TRUNCATION_MARKER: &str = "\n[capture truncated]";

/// Aggregate counters for the `Stats` query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

/// In-memory job store with write-through persistence.
pub struct JobStore {
    jobs: RwLock<HashMap<String, Job>>,
    ids: JobIdGen,
    events: EventBus,
    flush: Mutex<Option<FlushHandle>>,
}

impl JobStore {
    pub fn new(events: EventBus) -> Arc<Self> {
        Arc::new(Self {
            jobs: RwLock::new(HashMap::new()),
            ids: JobIdGen::new(),
            events,
            flush: Mutex::new(None),
        })
    }

    /// Attach the persistence flusher. Wired once at startup; mutations
    /// before that (snapshot load) intentionally do not write back.
    pub fn set_flush(&self, handle: FlushHandle) {
        *self.flush.lock() = Some(handle);
    }

    fn request_flush(&self) {
        if let Some(handle) = &*self.flush.lock() {
            handle.request();
        }
    }

    /// Seed the store from a loaded snapshot, advancing the id counter
    /// past every numeric id seen.
    pub fn load(&self, loaded: Vec<Job>) {
        let mut jobs = self.jobs.write();
        for job in loaded {
            self.ids.advance_past(&job.id);
            jobs.insert(job.id.clone(), job);
        }
    }

    /// Create a job from a spec. The id is assigned when absent.
    pub fn create(&self, mut spec: JobSpec) -> Result<Job, JobError> {
        spec.validate()?;
        if spec.cwd.is_none() {
            spec.cwd = std::env::current_dir().ok();
        }
        if spec.user.is_none() {
            spec.user = Some(crate::env::user());
        }
        let mut jobs = self.jobs.write();
        let id = match spec.id.take() {
            Some(id) => {
                if jobs.contains_key(&id) {
                    return Err(JobError::InvalidSpec(format!("job id `{id}` already exists")));
                }
                id
            }
            None => self.ids.next_id(),
        };
        let job = Job::from_spec(spec, id.clone(), Utc::now());
        jobs.insert(id, job.clone());
        drop(jobs);

        info!(job_id = %job.id, name = %job.name, kind = %job.kind, "job created");
        self.events.emit(Event::JobCreated {
            id: job.id.clone(),
            name: job.name.clone(),
            kind: job.kind,
            created_at: job.created_at,
        });
        self.request_flush();
        Ok(job)
    }

    pub fn get(&self, id: &str) -> Result<Job, JobError> {
        self.jobs
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// Snapshot matching `filter`, newest first.
    pub fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobError> {
        let compiled = filter.compile()?;
        let jobs = self.jobs.read();
        let mut out: Vec<Job> = jobs.values().filter(|j| compiled.matches(j)).cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(out)
    }

    /// All jobs, unordered — the flusher's snapshot source.
    pub fn snapshot_jobs(&self) -> Vec<Job> {
        self.jobs.read().values().cloned().collect()
    }

    /// Patch mutable metadata. Lifecycle fields are untouchable here.
    pub fn update(&self, id: &str, patch: &JobPatch) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(id).ok_or_else(|| JobError::NotFound(id.to_string()))?;
        patch.apply(job)?;
        let job = job.clone();
        drop(jobs);

        self.request_flush();
        Ok(job)
    }

    /// Atomic status transition with extras. Rejects anything outside the
    /// legal-transition table.
    pub fn update_status(
        &self,
        id: &str,
        next: JobStatus,
        change: StatusChange,
    ) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(id).ok_or_else(|| JobError::NotFound(id.to_string()))?;
        let prev = job.status;
        if !prev.can_transition_to(next) {
            return Err(JobError::bad_transition(id, prev, next));
        }

        let now = Utc::now();
        if next == JobStatus::Running && prev != JobStatus::Paused {
            // Fresh run (create or restart): previous outcome is stale.
            job.started_at = Some(now);
            job.completed_at = None;
            job.exit_code = None;
            job.stdout.clear();
            job.stderr.clear();
        }
        if next.is_terminal() {
            job.completed_at = Some(now);
            if change.exit_code.is_some() {
                job.exit_code = change.exit_code;
            }
        }
        if let Some(pid) = change.pid {
            job.pid = Some(pid);
        }
        if let Some(ppid) = change.ppid {
            job.ppid = Some(ppid);
        }
        job.status = next;
        let job = job.clone();
        drop(jobs);

        info!(job_id = %job.id, from = %prev, to = %next, "status transition");
        self.emit_transition(&job, prev, change);
        self.request_flush();
        Ok(job)
    }

    fn emit_transition(&self, job: &Job, prev: JobStatus, change: StatusChange) {
        let id = job.id.clone();
        let event = match job.status {
            JobStatus::Running if prev == JobStatus::Paused => Event::JobResumed { id },
            JobStatus::Running => Event::JobStarted { id, pid: job.pid.unwrap_or_default() },
            JobStatus::Paused => Event::JobPaused { id },
            JobStatus::Completed => {
                Event::JobCompleted { id, exit_code: job.exit_code.unwrap_or_default() }
            }
            JobStatus::Failed => Event::JobFailed { id, exit_code: job.exit_code, error: None },
            JobStatus::Killed => Event::JobKilled { id, signal: change.signal },
            // No dedicated event for created/stopped lands here.
            JobStatus::Created | JobStatus::Stopped => return,
        };
        self.events.emit(event);
    }

    /// Record an OS spawn refusal: the job lands in `failed` with the OS
    /// message captured in stderr. This is the one path into `failed`
    /// that does not go through `running`.
    pub fn record_spawn_failure(&self, id: &str, error: &str) {
        let mut jobs = self.jobs.write();
        let Some(job) = jobs.get_mut(id) else {
            warn!(job_id = id, "spawn failure for unknown job");
            return;
        };
        job.status = JobStatus::Failed;
        job.completed_at = Some(Utc::now());
        if !job.stderr.is_empty() {
            job.stderr.push('\n');
        }
        job.stderr.push_str(error);
        drop(jobs);

        warn!(job_id = id, error, "spawn failed");
        self.events.emit(Event::JobFailed {
            id: id.to_string(),
            exit_code: None,
            error: Some(error.to_string()),
        });
        self.request_flush();
    }

    /// Rearm a finished scheduled job so the restart path applies on its
    /// next fire. Internal to the due-dispatch; clients never see it.
    pub fn prepare_restart(&self, id: &str) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(id).ok_or_else(|| JobError::NotFound(id.to_string()))?;
        match job.status {
            JobStatus::Created | JobStatus::Stopped => {}
            JobStatus::Completed | JobStatus::Failed | JobStatus::Killed => {
                job.status = JobStatus::Stopped;
            }
            status => {
                return Err(JobError::InvalidState {
                    id: id.to_string(),
                    status,
                    reason: "cannot rearm a live job".into(),
                })
            }
        }
        Ok(job.clone())
    }

    /// Remove a job record. Live jobs are refused here — the daemon kills
    /// and waits for the exit event first, then calls remove again.
    pub fn remove(&self, id: &str, force: bool) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write();
        let status = jobs
            .get(id)
            .map(|j| j.status)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;
        if status.is_live() {
            return Err(JobError::InvalidState {
                id: id.to_string(),
                status,
                reason: "stop or force-kill it before removing".into(),
            });
        }
        if status == JobStatus::Stopped && !force {
            return Err(JobError::InvalidState {
                id: id.to_string(),
                status,
                reason: "use force to remove a stopped job".into(),
            });
        }
        let Some(job) = jobs.remove(id) else {
            return Err(JobError::NotFound(id.to_string()));
        };
        drop(jobs);

        info!(job_id = id, "job removed");
        self.events.emit(Event::JobRemoved { id: id.to_string() });
        self.request_flush();
        Ok(job)
    }

    /// Drop terminal jobs whose `completed_at` is older than the cutoff.
    /// Returns the removed ids.
    pub fn cleanup(&self, older_than: DateTime<Utc>) -> Vec<String> {
        let mut jobs = self.jobs.write();
        let doomed: Vec<String> = jobs
            .values()
            .filter(|j| {
                j.is_terminal() && j.completed_at.is_some_and(|done| done < older_than)
            })
            .map(|j| j.id.clone())
            .collect();
        for id in &doomed {
            jobs.remove(id);
        }
        drop(jobs);

        if !doomed.is_empty() {
            info!(count = doomed.len(), "cleaned up terminal jobs");
            for id in &doomed {
                self.events.emit(Event::JobRemoved { id: id.clone() });
            }
            self.request_flush();
        }
        doomed
    }

    /// Append child output to the bounded capture buffer and publish it.
    pub fn append_capture(&self, id: &str, stream: OutputStream, bytes: &[u8]) {
        let chunk = String::from_utf8_lossy(bytes).into_owned();
        {
            let mut jobs = self.jobs.write();
            let Some(job) = jobs.get_mut(id) else {
                return;
            };
            let buf = match stream {
                OutputStream::Stdout => &mut job.stdout,
                OutputStream::Stderr => &mut job.stderr,
            };
            append_bounded(buf, &chunk);
        }
        self.events.emit(Event::JobOutput { id: id.to_string(), stream, chunk });
    }

    pub fn stats(&self) -> StoreStats {
        let jobs = self.jobs.read();
        let mut stats = StoreStats { total: jobs.len(), ..Default::default() };
        for job in jobs.values() {
            *stats.by_status.entry(job.status.to_string()).or_default() += 1;
            *stats.by_type.entry(job.kind.to_string()).or_default() += 1;
            match job.status {
                JobStatus::Running => stats.running += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
                _ => {}
            }
        }
        stats
    }
}

/// Append `chunk` to `buf`, truncating at [`CAPTURE_LIMIT`] with a single
/// marker. Returns whether anything was dropped.
fn append_bounded(buf: &mut String, chunk: &str) -> bool {
    if buf.len() >= CAPTURE_LIMIT {
        return true;
    }
    let remaining = CAPTURE_LIMIT - buf.len();
    if chunk.len() <= remaining {
        buf.push_str(chunk);
        return false;
    }
    let mut end = remaining;
    while end > 0 && !chunk.is_char_boundary(end) {
        end -= 1;
    }
    buf.push_str(&chunk[..end]);
    buf.push_str(TRUNCATION_MARKER);
    true
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
