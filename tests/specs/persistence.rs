// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Write-through persistence observed from the outside.

use crate::helpers::{daemon_in, wait_snapshot_len, wait_terminal};
use lsh_core::{JobPatch, JobSpec, JobStatus};
use lsh_daemon::{handle_request, Request, Response};
use lsh_storage::SnapshotFile;
use std::time::Duration;

#[tokio::test]
async fn every_client_visible_mutation_reaches_disk() {
    let dir = tempfile::tempdir().unwrap();
    let jobs_path = dir.path().join("jobs.json");
    let daemon = daemon_in(dir.path(), "d", &jobs_path).await;
    let snapshot = SnapshotFile::new(&jobs_path);

    // create
    let Response::Job { job } =
        handle_request(&daemon.ctx, Request::CreateJob { spec: JobSpec::new("echo persisted") })
            .await
    else {
        panic!("create failed");
    };
    wait_snapshot_len(&jobs_path, 1, Duration::from_secs(2)).await;
    assert_eq!(snapshot.load()[0].id, job.id);

    // update
    let patch = JobPatch { name: Some("renamed".into()), ..Default::default() };
    handle_request(&daemon.ctx, Request::UpdateJob { id: job.id.clone(), patch }).await;
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    loop {
        if snapshot.load().first().map(|j| j.name.clone()).as_deref() == Some("renamed") {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "update never flushed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // status change via a full run
    handle_request(&daemon.ctx, Request::StartJob { id: job.id.clone() }).await;
    wait_terminal(&daemon.ctx, &job.id, Duration::from_secs(5)).await;
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    loop {
        if snapshot.load().first().map(|j| j.status) == Some(JobStatus::Completed) {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "completion never flushed");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // remove
    handle_request(&daemon.ctx, Request::RemoveJob { id: job.id.clone(), force: false }).await;
    wait_snapshot_len(&jobs_path, 0, Duration::from_secs(2)).await;
}

#[tokio::test]
async fn reload_equals_store_modulo_live_normalization() {
    let dir = tempfile::tempdir().unwrap();
    let jobs_path = dir.path().join("jobs.json");
    let daemon = daemon_in(dir.path(), "d", &jobs_path).await;

    let Response::Job { job: done } =
        handle_request(&daemon.ctx, Request::CreateJob { spec: JobSpec::new("echo done") }).await
    else {
        panic!("create failed");
    };
    handle_request(&daemon.ctx, Request::StartJob { id: done.id.clone() }).await;
    wait_terminal(&daemon.ctx, &done.id, Duration::from_secs(5)).await;

    let Response::Job { job: live } =
        handle_request(&daemon.ctx, Request::CreateJob { spec: JobSpec::new("sleep 20") }).await
    else {
        panic!("create failed");
    };
    handle_request(&daemon.ctx, Request::StartJob { id: live.id.clone() }).await;

    // Wait for the flusher to observe both jobs in their current states.
    let snapshot = SnapshotFile::new(&jobs_path);
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    loop {
        let on_disk = snapshot.load();
        if on_disk.len() == 2 && on_disk.iter().any(|j| j.status == JobStatus::Stopped) {
            break;
        }
        assert!(std::time::Instant::now() < deadline, "snapshot lagging");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let mut in_memory = daemon.ctx.store.snapshot_jobs();
    let mut reloaded = snapshot.load();
    in_memory.sort_by(|a, b| a.id.cmp(&b.id));
    reloaded.sort_by(|a, b| a.id.cmp(&b.id));

    for (memory, disk) in in_memory.iter().zip(&reloaded) {
        assert_eq!(memory.id, disk.id);
        assert_eq!(memory.command, disk.command);
        assert_eq!(memory.created_at, disk.created_at);
        if memory.status.is_live() {
            assert_eq!(disk.status, JobStatus::Stopped, "live jobs normalize on load");
        } else {
            assert_eq!(memory.status, disk.status);
        }
    }

    daemon.ctx.supervisor.kill_and_wait(&live.id, Duration::from_secs(3)).await;
}
