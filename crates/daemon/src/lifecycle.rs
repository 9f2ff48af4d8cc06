// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, recovery, drain, shutdown.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::daemon::{dispatch_due, DaemonCtx, Phase};
use crate::env;
use crate::event_bus::EventBus;
use crate::scheduler::{spawn_scheduler, Due};
use crate::store::JobStore;
use crate::supervisor::Supervisor;
use fs2::FileExt;
use lsh_core::{JobStatus, SystemClock};
use lsh_storage::{spawn_flusher, FlushHandle, SnapshotFile};
use thiserror::Error;
use tokio::sync::{mpsc, watch, Notify};
use tracing::{info, warn};

/// Daemon configuration paths.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (logs, pid file)
    pub state_dir: PathBuf,
    /// Control socket path
    pub socket_path: PathBuf,
    /// Lock/pid file path
    pub lock_path: PathBuf,
    /// Daemon log file path
    pub log_path: PathBuf,
    /// Job snapshot path
    pub jobs_path: PathBuf,
}

impl Config {
    /// Resolve paths from the environment.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir().ok_or(LifecycleError::NoStateDir)?;
        Ok(Self {
            socket_path: env::socket_path(),
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            jobs_path: env::jobs_file(),
            state_dir,
        })
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory (no HOME?)")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fully wired daemon, ready to run.
pub struct Daemon {
    pub ctx: Arc<DaemonCtx>,
    pub config: Config,
    // NOTE(lifetime): held to maintain the exclusive pid-file lock
    #[allow(dead_code)]
    lock_file: File,
    flush: FlushHandle,
    due_rx: mpsc::Receiver<Due>,
}

/// Assemble the daemon: lock, load the snapshot, reconcile, seed the
/// scheduler, bind the socket.
#[cfg(unix)]
pub async fn startup(config: &Config) -> Result<(Daemon, tokio::net::UnixListener), LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    let lock_file = acquire_lock(&config.lock_path)?;

    let snapshot = SnapshotFile::new(&config.jobs_path);
    let events = EventBus::new();
    let store = JobStore::new(events.clone());
    let loaded = snapshot.load();
    if !loaded.is_empty() {
        info!(count = loaded.len(), path = %config.jobs_path.display(), "loaded snapshot");
    }
    store.load(loaded);

    let flush = spawn_flusher(snapshot, {
        let store = Arc::clone(&store);
        move || store.snapshot_jobs()
    });
    store.set_flush(flush.clone());

    let supervisor = Supervisor::new(Arc::clone(&store));
    let (due_tx, due_rx) = mpsc::channel(256);
    let scheduler = spawn_scheduler(SystemClock, due_tx);

    // Re-enter schedulable jobs: created ones that never ran, and stopped
    // ones whose recurrence a restart interrupted.
    for job in store.snapshot_jobs() {
        if job.is_scheduled() && matches!(job.status, JobStatus::Created | JobStatus::Stopped) {
            scheduler.add(job);
        }
    }

    if config.socket_path.exists() {
        // Stale socket from an unclean exit; the pid-file lock already
        // proved no other daemon is alive.
        let _ = std::fs::remove_file(&config.socket_path);
    }
    let listener = tokio::net::UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    let (phase, _) = watch::channel(Phase::Starting);
    let ctx = Arc::new(DaemonCtx {
        store,
        supervisor,
        scheduler,
        events,
        phase,
        shutdown: Arc::new(Notify::new()),
    });

    Ok((
        Daemon { ctx, config: config.clone(), lock_file, flush, due_rx },
        listener,
    ))
}

impl Daemon {
    /// The due-job channel, for embedders that pump the loop themselves
    /// instead of calling [`Daemon::run`].
    pub fn due_receiver(&mut self) -> &mut mpsc::Receiver<Due> {
        &mut self.due_rx
    }

    /// Run until a shutdown request or signal, then drain.
    #[cfg(unix)]
    pub async fn run(mut self, listener: tokio::net::UnixListener) -> Result<(), LifecycleError> {
        use tokio::signal::unix::{signal, SignalKind};

        tokio::spawn(crate::listener::Listener::new(listener, Arc::clone(&self.ctx)).run());

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        self.ctx.phase.send_replace(Phase::Ready);
        info!(socket = %self.config.socket_path.display(), "daemon ready");

        loop {
            tokio::select! {
                maybe_due = self.due_rx.recv() => match maybe_due {
                    Some(due) => dispatch_due(&self.ctx, due).await,
                    None => break,
                },
                _ = self.ctx.shutdown.notified() => {
                    info!("shutdown requested over IPC");
                    break;
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, draining");
                    break;
                }
                _ = sigint.recv() => {
                    info!("received SIGINT, draining");
                    break;
                }
            }
        }

        self.drain().await;
        Ok(())
    }

    /// Wind down: refuse new work, soft-terminate live jobs, escalate
    /// after the grace period, flush, release files.
    pub async fn drain(&mut self) {
        self.ctx.phase.send_replace(Phase::Draining);

        let live = self.ctx.supervisor.live_jobs();
        if !live.is_empty() {
            info!(count = live.len(), "stopping live jobs");
        }
        for id in &live {
            if let Err(e) = self.ctx.supervisor.stop(id, None) {
                warn!(job_id = %id, error = %e, "stop during drain failed");
            }
        }

        let deadline = tokio::time::Instant::now() + env::drain_timeout();
        while !self.ctx.supervisor.live_jobs().is_empty()
            && tokio::time::Instant::now() < deadline
        {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        for id in self.ctx.supervisor.live_jobs() {
            warn!(job_id = %id, "escalating to hard kill");
            self.ctx.supervisor.kill_and_wait(&id, Duration::from_secs(1)).await;
        }

        // Final flush through the write-coalescing path; failures are
        // logged by the flusher itself.
        self.flush.flush_now().await;
        info!(path = %self.config.jobs_path.display(), "final snapshot flush complete");

        self.ctx.phase.send_replace(Phase::Stopped);
        let _ = std::fs::remove_file(&self.config.socket_path);
        let _ = std::fs::remove_file(&self.config.lock_path);
        info!("daemon stopped");
    }
}

/// Take the exclusive pid-file lock, writing our pid into it.
fn acquire_lock(path: &std::path::Path) -> Result<File, LifecycleError> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)?;
    file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    file.set_len(0)?;
    write!(file, "{}", std::process::id())?;
    Ok(file)
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
