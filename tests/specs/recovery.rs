// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash recovery: the daemon dies abruptly; a successor loads the
//! snapshot and carries on.

use crate::helpers::{daemon_in, wait_terminal};
use lsh_core::{JobSpec, JobStatus};
use lsh_daemon::{handle_request, Request, Response};
use lsh_storage::SnapshotFile;
use std::time::Duration;

#[tokio::test]
async fn short_job_survives_as_completed_long_job_as_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let jobs_path = dir.path().join("jobs.json");

    // First daemon: one short job run to completion, one long job still
    // running when the "crash" happens.
    let first = daemon_in(dir.path(), "first", &jobs_path).await;

    let Response::Job { job: short } =
        handle_request(&first.ctx, Request::CreateJob { spec: JobSpec::new("echo quick") }).await
    else {
        panic!("create failed");
    };
    handle_request(&first.ctx, Request::StartJob { id: short.id.clone() }).await;
    wait_terminal(&first.ctx, &short.id, Duration::from_secs(5)).await;

    let Response::Job { job: long } =
        handle_request(&first.ctx, Request::CreateJob { spec: JobSpec::new("sleep 30") }).await
    else {
        panic!("create failed");
    };
    let Response::Job { job: long_running } =
        handle_request(&first.ctx, Request::StartJob { id: long.id.clone() }).await
    else {
        panic!("start failed");
    };
    let old_pid = long_running.pid.expect("running job has a pid");

    // Wait until the snapshot has both jobs with the long one `running`,
    // then drop the daemon without draining — an abrupt death.
    let snapshot = SnapshotFile::new(&jobs_path);
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    loop {
        let on_disk = snapshot.load();
        // load() normalizes running→stopped, so check the raw document.
        let raw = std::fs::read_to_string(&jobs_path).unwrap_or_default();
        if on_disk.len() == 2 && raw.contains("\"running\"") {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "snapshot lagging");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let long_id = long.id.clone();
    let short_id = short.id.clone();
    drop(first);

    // Second daemon, separate state dir, same snapshot file.
    let second = daemon_in(dir.path(), "second", &jobs_path).await;

    let short_loaded = second.ctx.store.get(&short_id).unwrap();
    assert_eq!(short_loaded.status, JobStatus::Completed);
    assert_eq!(short_loaded.exit_code, Some(0));

    let long_loaded = second.ctx.store.get(&long_id).unwrap();
    assert_eq!(long_loaded.status, JobStatus::Stopped, "running reconciles to stopped");
    assert_eq!(long_loaded.pid, Some(old_pid), "stale pid kept for inspection");
    assert!(
        second.ctx.supervisor.live_pid(&long_id).is_none(),
        "no live handle for a loaded job"
    );

    // Restarting yields a fresh pid.
    let Response::Job { job: restarted } =
        handle_request(&second.ctx, Request::StartJob { id: long_id.clone() }).await
    else {
        panic!("restart failed");
    };
    assert_ne!(restarted.pid, Some(old_pid));
    assert_eq!(restarted.status, JobStatus::Running);

    // New ids never collide with loaded ones.
    let Response::Job { job: fresh } =
        handle_request(&second.ctx, Request::CreateJob { spec: JobSpec::new("true") }).await
    else {
        panic!("create failed");
    };
    assert_ne!(fresh.id, short_id);
    assert_ne!(fresh.id, long_id);

    second.ctx.supervisor.kill_and_wait(&long_id, Duration::from_secs(3)).await;
}
