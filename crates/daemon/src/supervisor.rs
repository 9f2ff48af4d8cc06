// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process supervisor: owns every OS child from spawn to exit.
//!
//! Each started job gets one supervising task that is the only writer of
//! that job's terminal-status fields. Stdout/stderr are pumped into the
//! store's bounded capture buffers (and the job's log file, when set)
//! by two reader tasks per child.

use crate::env;
use crate::store::JobStore;
use lsh_core::{Job, JobError, JobStatus, JobType, OutputStream, StatusChange};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Read chunk size for the capture pumps.
const PUMP_BUF: usize = 8 * 1024;

/// Soft-terminate and hard-kill signal numbers (SIGTERM / SIGKILL).
pub const SOFT_SIGNAL: i32 = 15;
pub const HARD_SIGNAL: i32 = 9;

/// Who is asking for a start. Scheduler-origin starts may rearm a
/// finished scheduled job through the restart path; client starts obey
/// the transition table as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOrigin {
    Client,
    Scheduler,
}

/// Live supervision handle for one running or paused job.
struct ProcessHandle {
    pid: u32,
    exited: watch::Receiver<bool>,
}

/// Supervisor over all live children, keyed by job id.
pub struct Supervisor {
    store: Arc<JobStore>,
    handles: Mutex<HashMap<String, ProcessHandle>>,
}

impl Supervisor {
    pub fn new(store: Arc<JobStore>) -> Arc<Self> {
        Arc::new(Self { store, handles: Mutex::new(HashMap::new()) })
    }

    /// Ids of jobs that currently own a live process handle.
    pub fn live_jobs(&self) -> Vec<String> {
        self.handles.lock().keys().cloned().collect()
    }

    /// Pid of the live process for `id`, if any.
    pub fn live_pid(&self, id: &str) -> Option<u32> {
        self.handles.lock().get(id).map(|h| h.pid)
    }

    /// Spawn the job's process and hand it to a supervising task.
    pub async fn start(self: &Arc<Self>, id: &str, origin: StartOrigin) -> Result<Job, JobError> {
        let job = self.store.get(id)?;
        match job.status {
            JobStatus::Created | JobStatus::Stopped => {}
            JobStatus::Running | JobStatus::Paused => {
                return Err(JobError::InvalidState {
                    id: id.to_string(),
                    status: job.status,
                    reason: "already running".into(),
                });
            }
            _ if origin == StartOrigin::Scheduler => {
                self.store.prepare_restart(id)?;
            }
            status => {
                return Err(JobError::InvalidState {
                    id: id.to_string(),
                    status,
                    reason: "cannot start a finished job".into(),
                });
            }
        }

        let mut command = build_command(&job)?;
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let message = e.to_string();
                self.store.record_spawn_failure(id, &message);
                return Err(JobError::SpawnFailed { command: job.command, source: e });
            }
        };
        let pid = child.id().unwrap_or_default();
        info!(job_id = id, pid, command = %job.command, "spawned");

        if let Some(priority) = job.priority {
            apply_priority(pid, priority).await;
        }

        let started = match self.store.update_status(
            id,
            JobStatus::Running,
            StatusChange::started(pid, std::process::id()),
        ) {
            Ok(job) => job,
            Err(e) => {
                // The record changed under us (e.g. concurrent removal);
                // do not leave an unsupervised child behind.
                let _ = child.start_kill();
                return Err(e);
            }
        };

        let (exit_tx, exit_rx) = watch::channel(false);
        self.handles.lock().insert(id.to_string(), ProcessHandle { pid, exited: exit_rx });

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let sup = Arc::clone(self);
        let job_id = id.to_string();
        let log_file = job.log_file.clone();
        let timeout = job.timeout_ms.map(Duration::from_millis);
        tokio::spawn(async move {
            let out = stdout.map(|r| {
                tokio::spawn(pump(
                    Arc::clone(&sup.store),
                    job_id.clone(),
                    OutputStream::Stdout,
                    r,
                    log_file.clone(),
                ))
            });
            let err = stderr.map(|r| {
                tokio::spawn(pump(
                    Arc::clone(&sup.store),
                    job_id.clone(),
                    OutputStream::Stderr,
                    r,
                    log_file,
                ))
            });

            let (status, timed_out) = wait_with_timeout(&mut child, pid, &job_id, timeout).await;

            // Drain remaining output before finalizing so captures are
            // complete when the terminal status lands.
            if let Some(task) = out {
                let _ = task.await;
            }
            if let Some(task) = err {
                let _ = task.await;
            }

            sup.finalize(&job_id, status, timed_out);
            let _ = exit_tx.send(true);
        });

        Ok(started)
    }

    /// Classify the child's exit and record it; stale exits (the job was
    /// stopped or removed first) are logged and discarded.
    fn finalize(&self, id: &str, status: Option<std::process::ExitStatus>, timed_out: bool) {
        self.handles.lock().remove(id);

        let Some(status) = status else {
            warn!(job_id = id, "wait for child failed, dropping handle");
            return;
        };
        let exit_code = status.code();
        let signal = exit_signal(&status);

        let final_status = if exit_code == Some(0) {
            JobStatus::Completed
        } else if signal == Some(HARD_SIGNAL) {
            JobStatus::Killed
        } else {
            JobStatus::Failed
        };
        if timed_out {
            info!(job_id = id, "killed by timeout");
        }

        match self.store.update_status(
            id,
            final_status,
            StatusChange::exited(exit_code, signal),
        ) {
            Ok(_) => {
                info!(job_id = id, status = %final_status, exit_code, signal, "job exited")
            }
            Err(JobError::NotFound(_)) => {
                debug!(job_id = id, "exit for a removed job, ignoring")
            }
            Err(e) => warn!(job_id = id, error = %e, "discarding stale exit event"),
        }
    }

    /// Forward a caller-chosen signal (default soft-terminate) and mark
    /// the job stopped. Stopping a job that already finished is a no-op.
    pub fn stop(&self, id: &str, signal: Option<i32>) -> Result<Job, JobError> {
        let job = self.store.get(id)?;
        match job.status {
            JobStatus::Running | JobStatus::Paused => {}
            JobStatus::Stopped | JobStatus::Completed | JobStatus::Failed | JobStatus::Killed => {
                // Idempotent: the process is already gone.
                return Ok(job);
            }
            JobStatus::Created => {
                return Err(JobError::InvalidState {
                    id: id.to_string(),
                    status: job.status,
                    reason: "not running".into(),
                });
            }
        }
        if let Some(pid) = self.live_pid(id) {
            if job.status == JobStatus::Paused {
                // A stopped-state process cannot act on the signal until
                // it is continued.
                let _ = send_cont(pid);
            }
            signal_pid(pid, signal.unwrap_or(SOFT_SIGNAL))?;
        }
        match self.store.update_status(id, JobStatus::Stopped, StatusChange::default()) {
            // The natural exit won the race; that final state stands.
            Err(JobError::InvalidState { .. }) => self.store.get(id),
            other => other,
        }
    }

    /// Send the hard-kill signal (or a chosen one) without pre-empting the
    /// exit classification: the supervising task records `killed`.
    pub fn kill(&self, id: &str, signal: Option<i32>) -> Result<Job, JobError> {
        let job = self.store.get(id)?;
        match job.status {
            JobStatus::Running | JobStatus::Paused => {
                if let Some(pid) = self.live_pid(id) {
                    if job.status == JobStatus::Paused {
                        let _ = send_cont(pid);
                    }
                    signal_pid(pid, signal.unwrap_or(HARD_SIGNAL))?;
                }
                self.store.get(id)
            }
            JobStatus::Created => {
                // Nothing spawned yet; the record alone transitions.
                self.store.update_status(id, JobStatus::Killed, StatusChange::default())
            }
            _ => Ok(job),
        }
    }

    /// Pause via the stop-signal. Fails as unsupported where job-control
    /// signals do not exist.
    pub fn pause(&self, id: &str) -> Result<Job, JobError> {
        if !cfg!(unix) {
            return Err(JobError::Unsupported("pause"));
        }
        let job = self.store.get(id)?;
        if job.status != JobStatus::Running {
            return Err(JobError::InvalidState {
                id: id.to_string(),
                status: job.status,
                reason: "only a running job can be paused".into(),
            });
        }
        if let Some(pid) = self.live_pid(id) {
            send_stop(pid)?;
        }
        self.store.update_status(id, JobStatus::Paused, StatusChange::default())
    }

    /// Resume via the continue-signal. Pid does not change.
    pub fn resume(&self, id: &str) -> Result<Job, JobError> {
        if !cfg!(unix) {
            return Err(JobError::Unsupported("resume"));
        }
        let job = self.store.get(id)?;
        if job.status != JobStatus::Paused {
            return Err(JobError::InvalidState {
                id: id.to_string(),
                status: job.status,
                reason: "only a paused job can be resumed".into(),
            });
        }
        if let Some(pid) = self.live_pid(id) {
            send_cont(pid)?;
        }
        self.store.update_status(id, JobStatus::Running, StatusChange::default())
    }

    /// Hard-kill and wait for the supervising task to observe the exit.
    /// Returns once the job no longer owns a live handle.
    pub async fn kill_and_wait(&self, id: &str, grace: Duration) {
        let mut exited = {
            let handles = self.handles.lock();
            let Some(handle) = handles.get(id) else {
                return;
            };
            let kick = send_cont(handle.pid)
                .and_then(|()| signal_pid(handle.pid, HARD_SIGNAL));
            if let Err(e) = kick {
                warn!(job_id = id, error = %e, "hard kill failed");
            }
            handle.exited.clone()
        };
        if tokio::time::timeout(grace, exited.wait_for(|done| *done)).await.is_err() {
            warn!(job_id = id, "exit event not observed within grace period");
        }
    }
}

/// Build the process command per spawn semantics: `shell` routes through
/// the system shell ignoring argv; every other type tokenizes the command
/// on whitespace and appends argv.
fn build_command(job: &Job) -> Result<Command, JobError> {
    let mut command = match job.kind {
        JobType::Shell => {
            let mut c = Command::new(env::shell_program());
            c.arg("-c").arg(&job.command);
            c
        }
        JobType::System | JobType::Scheduled | JobType::Service => {
            let mut parts = job.command.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(JobError::InvalidSpec("command must not be empty".into()));
            };
            let mut c = Command::new(program);
            c.args(parts);
            c.args(&job.argv);
            c
        }
    };
    let cwd = if job.cwd.as_os_str().is_empty() {
        std::env::current_dir()?
    } else {
        job.cwd.clone()
    };
    command
        .current_dir(cwd)
        .envs(&job.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    Ok(command)
}

/// Wait for exit, arming the one-shot timeout timer when configured.
/// The timer escalates straight to the hard-kill signal.
async fn wait_with_timeout(
    child: &mut Child,
    pid: u32,
    job_id: &str,
    timeout: Option<Duration>,
) -> (Option<std::process::ExitStatus>, bool) {
    match timeout {
        None => (child.wait().await.ok(), false),
        Some(limit) => {
            tokio::select! {
                status = child.wait() => (status.ok(), false),
                _ = tokio::time::sleep(limit) => {
                    warn!(job_id, pid, timeout_ms = limit.as_millis() as u64, "timeout exceeded, sending hard kill");
                    let _ = signal_pid(pid, HARD_SIGNAL);
                    (child.wait().await.ok(), true)
                }
            }
        }
    }
}

/// Pump one child stream into the capture buffer and optional log file.
async fn pump(
    store: Arc<JobStore>,
    job_id: String,
    stream: OutputStream,
    mut reader: impl AsyncRead + Unpin,
    log_file: Option<PathBuf>,
) {
    let mut log = match log_file {
        Some(path) => match tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
        {
            Ok(file) => Some(file),
            Err(e) => {
                warn!(job_id = %job_id, path = %path.display(), error = %e, "log file open failed");
                None
            }
        },
        None => None,
    };
    let mut buf = [0u8; PUMP_BUF];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                store.append_capture(&job_id, stream, &buf[..n]);
                if let Some(file) = &mut log {
                    // Log appends are best-effort; capture already has it.
                    let _ = file.write_all(&buf[..n]).await;
                }
            }
        }
    }
}

/// Best-effort renice of a live process. The metadata change already
/// succeeded; an OS refusal only warns.
pub async fn apply_priority(pid: u32, priority: i32) {
    let result = Command::new("renice")
        .args(["-n", &priority.to_string(), "-p", &pid.to_string()])
        .output()
        .await;
    match result {
        Ok(out) if out.status.success() => {
            debug!(pid, priority, "applied nice value");
        }
        Ok(out) => warn!(
            pid,
            priority,
            stderr = %String::from_utf8_lossy(&out.stderr).trim(),
            "renice refused"
        ),
        Err(e) => warn!(pid, priority, error = %e, "renice unavailable"),
    }
}

/// Send a numeric signal to `pid`. A process that is already gone is not
/// an error.
#[cfg(unix)]
fn signal_pid(pid: u32, signal: i32) -> Result<(), JobError> {
    use nix::sys::signal::Signal;

    let signal = Signal::try_from(signal)
        .map_err(|_| JobError::InvalidSpec(format!("unknown signal {signal}")))?;
    send_signal(pid, signal)
}

#[cfg(unix)]
fn send_signal(pid: u32, signal: nix::sys::signal::Signal) -> Result<(), JobError> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), signal) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(JobError::Io(std::io::Error::from_raw_os_error(e as i32))),
    }
}

/// SIGSTOP-equivalent for pause.
#[cfg(unix)]
fn send_stop(pid: u32) -> Result<(), JobError> {
    send_signal(pid, nix::sys::signal::Signal::SIGSTOP)
}

/// SIGCONT-equivalent for resume (and before signalling a paused child).
#[cfg(unix)]
fn send_cont(pid: u32) -> Result<(), JobError> {
    send_signal(pid, nix::sys::signal::Signal::SIGCONT)
}

#[cfg(not(unix))]
fn signal_pid(_pid: u32, _signal: i32) -> Result<(), JobError> {
    Err(JobError::Unsupported("signals"))
}

#[cfg(not(unix))]
fn send_stop(_pid: u32) -> Result<(), JobError> {
    Err(JobError::Unsupported("pause"))
}

#[cfg(not(unix))]
fn send_cont(_pid: u32) -> Result<(), JobError> {
    Err(JobError::Unsupported("resume"))
}

/// Terminating signal of an exited child, when it did not exit normally.
#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
