// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawn-to-exit scenarios over the full request path.

use crate::helpers::{daemon_in, wait_terminal};
use lsh_core::{JobSpec, JobStatus};
use lsh_daemon::{handle_request, Request, Response};
use std::time::Duration;

#[tokio::test]
async fn simple_echo_completes_with_output() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = daemon_in(dir.path(), "d", &dir.path().join("jobs.json")).await;

    let Response::Job { job } =
        handle_request(&daemon.ctx, Request::CreateJob { spec: JobSpec::new("echo hello") }).await
    else {
        panic!("create failed");
    };
    handle_request(&daemon.ctx, Request::StartJob { id: job.id.clone() }).await;

    let done = wait_terminal(&daemon.ctx, &job.id, Duration::from_secs(5)).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.exit_code, Some(0));
    assert_eq!(done.stdout, "hello\n");
}

#[tokio::test]
async fn failing_command_reports_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = daemon_in(dir.path(), "d", &dir.path().join("jobs.json")).await;

    let Response::Job { job } =
        handle_request(&daemon.ctx, Request::CreateJob { spec: JobSpec::new("exit 3") }).await
    else {
        panic!("create failed");
    };
    handle_request(&daemon.ctx, Request::StartJob { id: job.id.clone() }).await;

    let done = wait_terminal(&daemon.ctx, &job.id, Duration::from_secs(5)).await;
    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.exit_code, Some(3));
}

#[tokio::test]
async fn timeout_kills_within_tolerance() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = daemon_in(dir.path(), "d", &dir.path().join("jobs.json")).await;

    let Response::Job { job } = handle_request(
        &daemon.ctx,
        Request::CreateJob { spec: JobSpec::new("sleep 5").timeout_ms(200u64) },
    )
    .await
    else {
        panic!("create failed");
    };
    let started = std::time::Instant::now();
    handle_request(&daemon.ctx, Request::StartJob { id: job.id.clone() }).await;

    let done = wait_terminal(&daemon.ctx, &job.id, Duration::from_secs(3)).await;
    assert_eq!(done.status, JobStatus::Killed);
    assert!(started.elapsed() >= Duration::from_millis(200));
    assert!(started.elapsed() < Duration::from_millis(1_500));
    let ran_for = (done.completed_at.unwrap() - done.started_at.unwrap()).num_milliseconds();
    assert!(ran_for >= 200, "ran only {ran_for}ms");
}

#[tokio::test]
async fn stop_twice_equals_stop_once() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = daemon_in(dir.path(), "d", &dir.path().join("jobs.json")).await;

    let Response::Job { job } =
        handle_request(&daemon.ctx, Request::CreateJob { spec: JobSpec::new("sleep 5") }).await
    else {
        panic!("create failed");
    };
    handle_request(&daemon.ctx, Request::StartJob { id: job.id.clone() }).await;

    let Response::Job { job: once } =
        handle_request(&daemon.ctx, Request::StopJob { id: job.id.clone(), signal: None }).await
    else {
        panic!("stop failed");
    };
    let Response::Job { job: twice } =
        handle_request(&daemon.ctx, Request::StopJob { id: job.id.clone(), signal: None }).await
    else {
        panic!("second stop failed");
    };
    assert_eq!(once.status, JobStatus::Stopped);
    assert_eq!(twice.status, JobStatus::Stopped);
}

#[cfg(unix)]
#[tokio::test]
async fn pause_resume_preserves_identity() {
    let dir = tempfile::tempdir().unwrap();
    let daemon = daemon_in(dir.path(), "d", &dir.path().join("jobs.json")).await;

    let Response::Job { job } =
        handle_request(&daemon.ctx, Request::CreateJob { spec: JobSpec::new("sleep 5") }).await
    else {
        panic!("create failed");
    };
    let Response::Job { job: started } =
        handle_request(&daemon.ctx, Request::StartJob { id: job.id.clone() }).await
    else {
        panic!("start failed");
    };

    let Response::Job { job: paused } =
        handle_request(&daemon.ctx, Request::PauseJob { id: job.id.clone() }).await
    else {
        panic!("pause failed");
    };
    assert_eq!(paused.status, JobStatus::Paused);

    let Response::Job { job: resumed } =
        handle_request(&daemon.ctx, Request::ResumeJob { id: job.id.clone() }).await
    else {
        panic!("resume failed");
    };
    assert_eq!(resumed.status, JobStatus::Running);
    assert_eq!(resumed.id, started.id);
    assert_eq!(resumed.pid, started.pid, "pid must survive pause/resume");

    handle_request(&daemon.ctx, Request::KillJob { id: job.id.clone(), signal: None }).await;
    wait_terminal(&daemon.ctx, &job.id, Duration::from_secs(3)).await;
}
