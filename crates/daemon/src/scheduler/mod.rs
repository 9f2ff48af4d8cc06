// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority-queue scheduler for cron and interval jobs.
//!
//! One task owns the heap. Commands arrive on a mailbox; due jobs go out
//! on a channel to the daemon loop, which dispatches them to the
//! supervisor. The wakeup timer always tracks the heap top, clamped to
//! `[MIN_TICK_INTERVAL, MAX_TICK_INTERVAL]`.

mod heap;
mod metrics;

pub use heap::{DueHeap, Entry};
pub use metrics::SchedulerMetrics;

use lsh_core::{Clock, CronExpr, Job, Schedule};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Shortest and longest sleeps between ticks.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(100);
pub const MAX_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Entries within this many milliseconds of now are treated as due.
pub const DUE_BUFFER_MS: u64 = 50;

/// A job whose fire time has arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Due {
    pub job_id: String,
    pub name: String,
    pub at_epoch_ms: u64,
}

enum Command {
    Add(Job),
    Remove(String),
    Update(Job),
}

/// Cloneable handle to the scheduler task.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<Command>,
    metrics: Arc<Mutex<SchedulerMetrics>>,
}

impl SchedulerHandle {
    /// Schedule a job. Jobs without a cron or interval are ignored.
    pub fn add(&self, job: Job) {
        let _ = self.tx.send(Command::Add(job));
    }

    pub fn remove(&self, id: &str) {
        let _ = self.tx.send(Command::Remove(id.to_string()));
    }

    /// Replace a job's entry with a freshly computed next run.
    pub fn update(&self, job: Job) {
        let _ = self.tx.send(Command::Update(job));
    }

    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics.lock().clone()
    }
}

/// Spawn the scheduler task. Due jobs are sent to `due_tx`.
pub fn spawn_scheduler<C: Clock>(clock: C, due_tx: mpsc::Sender<Due>) -> SchedulerHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let metrics = Arc::new(Mutex::new(SchedulerMetrics::default()));
    let scheduler = Scheduler::new(clock, due_tx, Arc::clone(&metrics));
    tokio::spawn(scheduler.run(rx));
    SchedulerHandle { tx, metrics }
}

struct Scheduler<C> {
    heap: DueHeap,
    /// Fired-minute guard per cron job id (epoch minutes).
    last_fired_minute: HashMap<String, u64>,
    clock: C,
    due_tx: mpsc::Sender<Due>,
    metrics: Arc<Mutex<SchedulerMetrics>>,
}

impl<C: Clock> Scheduler<C> {
    fn new(clock: C, due_tx: mpsc::Sender<Due>, metrics: Arc<Mutex<SchedulerMetrics>>) -> Self {
        Self { heap: DueHeap::new(), last_fired_minute: HashMap::new(), clock, due_tx, metrics }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        loop {
            let wait = self.wait_duration();
            tokio::select! {
                cmd = rx.recv() => match cmd {
                    Some(Command::Add(job)) => self.add(job),
                    Some(Command::Update(job)) => {
                        self.heap.remove(&job.id);
                        self.last_fired_minute.remove(&job.id);
                        self.add(job);
                    }
                    Some(Command::Remove(id)) => {
                        self.heap.remove(&id);
                        self.last_fired_minute.remove(&id);
                    }
                    None => break,
                },
                _ = tokio::time::sleep(wait) => self.tick().await,
            }
            self.metrics.lock().record_heap(self.heap.len());
        }
    }

    /// Sleep until the heap top is due, clamped. An empty heap sleeps the
    /// maximum; a command arrival interrupts the sleep, so a new earlier
    /// entry reschedules the wakeup immediately.
    fn wait_duration(&self) -> Duration {
        match self.heap.peek() {
            None => MAX_TICK_INTERVAL,
            Some(top) => {
                let now = self.clock.epoch_ms();
                Duration::from_millis(top.next_run_epoch_ms.saturating_sub(now))
                    .clamp(MIN_TICK_INTERVAL, MAX_TICK_INTERVAL)
            }
        }
    }

    fn add(&mut self, job: Job) {
        let Some(schedule) = job.schedule.clone() else {
            return;
        };
        if schedule.is_empty() {
            return;
        }
        let now = self.clock.epoch_ms();
        match initial_next_run(&schedule, now) {
            Some(at) => {
                debug!(job_id = %job.id, at, "scheduled");
                self.heap.push(Entry {
                    job_id: job.id.clone(),
                    name: job.name.clone(),
                    next_run_epoch_ms: at,
                    job,
                });
            }
            None => {
                warn!(job_id = %job.id, "no upcoming run within the horizon, not scheduling");
            }
        }
    }

    /// Pop and dispatch everything due, then reinsert recomputed runs.
    async fn tick(&mut self) {
        let tick_started = self.clock.now();
        let mut due_count = 0usize;

        loop {
            let now = self.clock.epoch_ms();
            let boundary = now + DUE_BUFFER_MS;
            match self.heap.peek() {
                Some(top) if top.next_run_epoch_ms <= boundary => {}
                _ => break,
            }
            let Some(entry) = self.heap.pop() else {
                break;
            };
            let is_cron = entry.job.schedule.as_ref().is_some_and(|s| s.cron.is_some());
            let minute = now / 60_000;

            if is_cron && self.last_fired_minute.get(&entry.job_id) == Some(&minute) {
                // Already fired inside this calendar minute; push the
                // entry forward without emitting.
                match next_run_after_fire(&entry.job, now + 60_000) {
                    Some(at) => self.heap.push(Entry { next_run_epoch_ms: at, ..entry }),
                    None => {
                        self.last_fired_minute.remove(&entry.job_id);
                    }
                }
                continue;
            }

            if self
                .due_tx
                .send(Due {
                    job_id: entry.job_id.clone(),
                    name: entry.name.clone(),
                    at_epoch_ms: entry.next_run_epoch_ms,
                })
                .await
                .is_err()
            {
                // Daemon loop is gone; stop emitting.
                return;
            }
            due_count += 1;
            if is_cron {
                self.last_fired_minute.insert(entry.job_id.clone(), minute);
            }

            match next_run_after_fire(&entry.job, now) {
                Some(at) => self.heap.push(Entry { next_run_epoch_ms: at, ..entry }),
                None => {
                    self.last_fired_minute.remove(&entry.job_id);
                    if is_cron {
                        warn!(job_id = %entry.job_id, "cron has no match within the horizon, dropped");
                    }
                }
            }
        }

        let took = self.clock.now().duration_since(tick_started);
        self.metrics.lock().record_tick(due_count, took, self.heap.len());
    }
}

/// First insertion: cron jobs take the next expression match; interval
/// jobs honor a provided `next_run` (even in the past — immediately due)
/// and otherwise fire right away.
fn initial_next_run(schedule: &Schedule, now: u64) -> Option<u64> {
    if let Some(expr) = &schedule.cron {
        return match CronExpr::parse(expr) {
            Ok(cron) => cron.next_after(now),
            Err(e) => {
                warn!(error = %e, "unparseable cron reached the scheduler");
                None
            }
        };
    }
    if schedule.interval_ms.is_some() {
        return Some(
            schedule
                .next_run
                .map(|at| at.timestamp_millis().max(0) as u64)
                .unwrap_or(now),
        );
    }
    None
}

/// Re-enqueue after firing: cron recomputes from `from`; interval jobs
/// fire again `interval_ms` later.
fn next_run_after_fire(job: &Job, from: u64) -> Option<u64> {
    let schedule = job.schedule.as_ref()?;
    if let Some(expr) = &schedule.cron {
        return CronExpr::parse(expr).ok().and_then(|cron| cron.next_after(from));
    }
    schedule.interval_ms.map(|interval| from + interval)
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
