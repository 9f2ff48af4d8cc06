// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler behavior observed end to end.

use crate::helpers::daemon_in;
use lsh_core::test_support::interval_job;
use lsh_core::{JobSpec, JobStatus, Schedule, SystemClock};
use lsh_daemon::scheduler::{spawn_scheduler, DUE_BUFFER_MS};
use lsh_daemon::{handle_request, Request, Response};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[tokio::test]
async fn interval_job_fires_on_cadence() {
    // 500ms interval observed for 2.1s: fires at ~0/500/1000/1500/2000.
    let (due_tx, mut due_rx) = mpsc::channel(64);
    let scheduler = spawn_scheduler(SystemClock, due_tx);
    let t0 = Instant::now();
    scheduler.add(interval_job("job_1", 500));

    let mut fired_at: Vec<Duration> = Vec::new();
    let deadline = t0 + Duration::from_millis(2_100);
    while Instant::now() < deadline {
        let left = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(left, due_rx.recv()).await {
            Ok(Some(due)) => {
                assert_eq!(due.job_id, "job_1");
                fired_at.push(t0.elapsed());
            }
            _ => break,
        }
    }

    assert!(
        (4..=5).contains(&fired_at.len()),
        "expected ~4 fires in 2.1s, got {fired_at:?}"
    );
    for pair in fired_at.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            gap >= Duration::from_millis(500 - DUE_BUFFER_MS),
            "consecutive fires only {gap:?} apart"
        );
    }
}

#[tokio::test]
async fn scheduled_job_runs_repeatedly_through_the_daemon() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = daemon_in(dir.path(), "d", &dir.path().join("jobs.json")).await;

    let Response::Job { job } = handle_request(
        &daemon.ctx,
        Request::CreateJob {
            spec: JobSpec::new("echo tick").schedule(Schedule::interval(400)),
        },
    )
    .await
    else {
        panic!("create failed");
    };

    // Drive the daemon's due loop by hand for ~1.3s (the full `run` loop
    // owns the process signals, so the test pumps the channel itself).
    let ctx = std::sync::Arc::clone(&daemon.ctx);
    let mut daemon = daemon;
    let mut runs = 0u32;
    let deadline = Instant::now() + Duration::from_millis(1_300);
    while Instant::now() < deadline {
        let left = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(left, daemon.due_receiver().recv()).await {
            Ok(Some(due)) => {
                lsh_daemon::daemon::dispatch_due(&ctx, due).await;
                runs += 1;
            }
            _ => break,
        }
    }
    assert!(runs >= 2, "expected repeated dispatches, got {runs}");

    // Let the last spawn finish, then confirm the job actually ran.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let job = ctx.store.get(&job.id).unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.stdout, "tick\n");
    assert!(job.pid.is_some());
}
