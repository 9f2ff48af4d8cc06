// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon context and control-plane request dispatch.

use crate::event_bus::EventBus;
use crate::monitor;
use crate::protocol::{DaemonStats, Request, Response};
use crate::scheduler::SchedulerHandle;
use crate::store::JobStore;
use crate::supervisor::{apply_priority, StartOrigin, Supervisor};
use chrono::Utc;
use lsh_core::{JobError, JobStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::warn;

/// Grace period when a force-remove must kill first.
const FORCE_KILL_GRACE: Duration = Duration::from_secs(5);

/// Daemon lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Starting,
    Ready,
    Draining,
    Stopped,
}

lsh_core::simple_display! {
    Phase {
        Starting => "starting",
        Ready => "ready",
        Draining => "draining",
        Stopped => "stopped",
    }
}

/// Shared daemon state handed to the listener and the main loop.
pub struct DaemonCtx {
    pub store: Arc<JobStore>,
    pub supervisor: Arc<Supervisor>,
    pub scheduler: SchedulerHandle,
    pub events: EventBus,
    pub phase: watch::Sender<Phase>,
    pub shutdown: Arc<Notify>,
}

impl DaemonCtx {
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    fn refuse_new_work(&self) -> Option<Response> {
        match self.phase() {
            Phase::Ready => None,
            phase => Some(Response::Error {
                kind: "invalid_state".into(),
                message: format!("daemon is {phase}, not accepting new work"),
            }),
        }
    }
}

/// Handle one control request and produce its response.
pub async fn handle_request(ctx: &DaemonCtx, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::CreateJob { spec } => {
            if let Some(refused) = ctx.refuse_new_work() {
                return refused;
            }
            match ctx.store.create(spec) {
                Ok(job) => {
                    if job.is_scheduled() {
                        ctx.scheduler.add(job.clone());
                    }
                    Response::Job { job }
                }
                Err(e) => e.into(),
            }
        }

        Request::StartJob { id } => {
            if let Some(refused) = ctx.refuse_new_work() {
                return refused;
            }
            match ctx.supervisor.start(&id, StartOrigin::Client).await {
                Ok(job) => Response::Job { job },
                Err(e) => e.into(),
            }
        }

        Request::StopJob { id, signal } => match ctx.supervisor.stop(&id, signal) {
            Ok(job) => Response::Job { job },
            Err(e) => e.into(),
        },

        Request::PauseJob { id } => match ctx.supervisor.pause(&id) {
            Ok(job) => Response::Job { job },
            Err(e) => e.into(),
        },

        Request::ResumeJob { id } => match ctx.supervisor.resume(&id) {
            Ok(job) => Response::Job { job },
            Err(e) => e.into(),
        },

        Request::KillJob { id, signal } => match ctx.supervisor.kill(&id, signal) {
            Ok(job) => Response::Job { job },
            Err(e) => e.into(),
        },

        Request::ListJobs { filter } => match ctx.store.list(&filter) {
            Ok(jobs) => Response::Jobs { jobs },
            Err(e) => e.into(),
        },

        Request::GetJob { id } => match ctx.store.get(&id) {
            Ok(job) => Response::Job { job },
            Err(e) => e.into(),
        },

        Request::UpdateJob { id, patch } => {
            let renice = patch.priority.is_some();
            let reschedule = patch.schedule.is_some();
            match ctx.store.update(&id, &patch) {
                Ok(job) => {
                    if renice && job.status.is_live() {
                        if let (Some(pid), Some(priority)) = (job.pid, job.priority) {
                            // Best-effort: the metadata change already stuck.
                            apply_priority(pid, priority).await;
                        }
                    }
                    if reschedule {
                        ctx.scheduler.update(job.clone());
                    }
                    Response::Job { job }
                }
                Err(e) => e.into(),
            }
        }

        Request::RemoveJob { id, force } => {
            let result = match ctx.store.get(&id) {
                Ok(job) if job.status.is_live() && force => {
                    // Hard-kill and wait for the exit event before the
                    // record goes away.
                    ctx.supervisor.kill_and_wait(&id, FORCE_KILL_GRACE).await;
                    ctx.store.remove(&id, force)
                }
                Ok(_) => ctx.store.remove(&id, force),
                Err(e) => Err(e),
            };
            match result {
                Ok(_) => {
                    ctx.scheduler.remove(&id);
                    Response::Removed { removed: true }
                }
                Err(e) => e.into(),
            }
        }

        Request::MonitorJob { id } => match ctx.store.get(&id) {
            Ok(job) if job.status.is_live() => match job.pid {
                Some(pid) => Response::Sample { sample: monitor::sample(pid).await },
                None => Response::Sample { sample: None },
            },
            Ok(_) => Response::Sample { sample: None },
            Err(e) => e.into(),
        },

        Request::Processes => {
            let processes =
                tokio::task::spawn_blocking(monitor::system_processes).await.unwrap_or_default();
            Response::Processes { processes }
        }

        Request::CleanupJobs { older_than_ms } => {
            let cutoff = Utc::now() - chrono::Duration::milliseconds(older_than_ms as i64);
            let removed = ctx.store.cleanup(cutoff);
            for id in &removed {
                ctx.scheduler.remove(id);
            }
            Response::Count { count: removed.len() }
        }

        Request::Stats => Response::Stats {
            stats: DaemonStats { store: ctx.store.stats(), scheduler: ctx.scheduler.metrics() },
        },

        Request::Shutdown => {
            ctx.shutdown.notify_one();
            Response::ShuttingDown
        }
    }
}

/// Start a due job, tolerating failure: the scheduler has already
/// re-enqueued (or dropped) the next run.
pub async fn dispatch_due(ctx: &DaemonCtx, due: crate::scheduler::Due) {
    ctx.events.emit(lsh_core::Event::JobDue {
        id: due.job_id.clone(),
        name: due.name.clone(),
        at_epoch_ms: due.at_epoch_ms,
    });
    if ctx.phase() != Phase::Ready {
        return;
    }
    match ctx.supervisor.start(&due.job_id, StartOrigin::Scheduler).await {
        Ok(_) => {}
        Err(JobError::NotFound(_)) => {
            // The record is gone; stop rescheduling it.
            ctx.scheduler.remove(&due.job_id);
        }
        Err(JobError::InvalidState { status: JobStatus::Running, .. })
        | Err(JobError::InvalidState { status: JobStatus::Paused, .. }) => {
            // Previous run still alive; skip this fire.
        }
        Err(e) => warn!(job_id = %due.job_id, error = %e, "failed to start due job"),
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
