// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::ready_ctx;
use lsh_core::{JobPatch, JobSpec, Schedule};
use std::time::Instant;

async fn wait_terminal(ctx: &DaemonCtx, id: &str) -> lsh_core::Job {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let job = ctx.store.get(id).expect("job exists");
        if job.is_terminal() {
            return job;
        }
        assert!(Instant::now() < deadline, "job {id} never finished");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn ping_pongs() {
    let (ctx, _due) = ready_ctx();
    assert_eq!(handle_request(&ctx, Request::Ping).await, Response::Pong);
}

#[tokio::test]
async fn create_then_get_then_list() {
    let (ctx, _due) = ready_ctx();
    let created = handle_request(
        &ctx,
        Request::CreateJob { spec: JobSpec::new("echo hi").name("greeter") },
    )
    .await;
    let Response::Job { job } = created else {
        panic!("expected job response, got {created:?}");
    };
    assert_eq!(job.name, "greeter");

    let fetched = handle_request(&ctx, Request::GetJob { id: job.id.clone() }).await;
    assert_eq!(fetched, Response::Job { job: job.clone() });

    let listed = handle_request(&ctx, Request::ListJobs { filter: Default::default() }).await;
    let Response::Jobs { jobs } = listed else {
        panic!("expected jobs response");
    };
    assert_eq!(jobs.len(), 1);
}

#[tokio::test]
async fn create_with_empty_command_is_invalid_spec() {
    let (ctx, _due) = ready_ctx();
    let response = handle_request(&ctx, Request::CreateJob { spec: JobSpec::new("") }).await;
    let Response::Error { kind, .. } = response else {
        panic!("expected error");
    };
    assert_eq!(kind, "invalid_spec");
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let (ctx, _due) = ready_ctx();
    let response = handle_request(&ctx, Request::GetJob { id: "job_404".into() }).await;
    let Response::Error { kind, .. } = response else {
        panic!("expected error");
    };
    assert_eq!(kind, "not_found");
}

#[tokio::test]
async fn start_runs_the_job_to_completion() {
    let (ctx, _due) = ready_ctx();
    let Response::Job { job } =
        handle_request(&ctx, Request::CreateJob { spec: JobSpec::new("echo done") }).await
    else {
        panic!("create failed");
    };
    let Response::Job { job: started } =
        handle_request(&ctx, Request::StartJob { id: job.id.clone() }).await
    else {
        panic!("start failed");
    };
    assert_eq!(started.status, JobStatus::Running);
    assert!(started.pid.is_some());

    let done = wait_terminal(&ctx, &job.id).await;
    assert_eq!(done.status, JobStatus::Completed);

    // Starting again from terminal is a client-side state error.
    let response = handle_request(&ctx, Request::StartJob { id: job.id }).await;
    assert!(response.is_error());
}

#[tokio::test]
async fn start_twice_conflicts() {
    let (ctx, _due) = ready_ctx();
    let Response::Job { job } =
        handle_request(&ctx, Request::CreateJob { spec: JobSpec::new("sleep 2") }).await
    else {
        panic!("create failed");
    };
    handle_request(&ctx, Request::StartJob { id: job.id.clone() }).await;
    let second = handle_request(&ctx, Request::StartJob { id: job.id.clone() }).await;
    let Response::Error { kind, .. } = second else {
        panic!("expected conflict");
    };
    assert_eq!(kind, "invalid_state");

    handle_request(&ctx, Request::KillJob { id: job.id.clone(), signal: None }).await;
    wait_terminal(&ctx, &job.id).await;
}

#[tokio::test]
async fn update_while_running_keeps_metadata_and_job_alive() {
    let (ctx, _due) = ready_ctx();
    let Response::Job { job } =
        handle_request(&ctx, Request::CreateJob { spec: JobSpec::new("sleep 2") }).await
    else {
        panic!("create failed");
    };
    handle_request(&ctx, Request::StartJob { id: job.id.clone() }).await;

    let patch = JobPatch { priority: Some(5), ..Default::default() };
    let Response::Job { job: updated } =
        handle_request(&ctx, Request::UpdateJob { id: job.id.clone(), patch }).await
    else {
        panic!("update failed");
    };
    assert_eq!(updated.priority, Some(5));
    assert_eq!(updated.status, JobStatus::Running, "renice never fails the update");

    handle_request(&ctx, Request::KillJob { id: job.id.clone(), signal: None }).await;
    wait_terminal(&ctx, &job.id).await;
}

#[tokio::test]
async fn remove_force_kills_live_job_first() {
    let (ctx, _due) = ready_ctx();
    let Response::Job { job } =
        handle_request(&ctx, Request::CreateJob { spec: JobSpec::new("sleep 5") }).await
    else {
        panic!("create failed");
    };
    handle_request(&ctx, Request::StartJob { id: job.id.clone() }).await;

    // Without force: refused while live.
    let refused =
        handle_request(&ctx, Request::RemoveJob { id: job.id.clone(), force: false }).await;
    assert!(refused.is_error());

    let removed =
        handle_request(&ctx, Request::RemoveJob { id: job.id.clone(), force: true }).await;
    assert_eq!(removed, Response::Removed { removed: true });
    assert!(ctx.store.get(&job.id).is_err(), "record gone only after the kill");
}

#[tokio::test]
async fn monitor_returns_sample_for_live_and_none_for_done() {
    let (ctx, _due) = ready_ctx();
    let Response::Job { job } =
        handle_request(&ctx, Request::CreateJob { spec: JobSpec::new("sleep 2") }).await
    else {
        panic!("create failed");
    };
    handle_request(&ctx, Request::StartJob { id: job.id.clone() }).await;

    let Response::Sample { sample } =
        handle_request(&ctx, Request::MonitorJob { id: job.id.clone() }).await
    else {
        panic!("expected sample");
    };
    let sample = sample.expect("live job samples");
    assert_eq!(Some(sample.pid), ctx.store.get(&job.id).unwrap().pid);

    handle_request(&ctx, Request::KillJob { id: job.id.clone(), signal: None }).await;
    wait_terminal(&ctx, &job.id).await;
    let Response::Sample { sample } =
        handle_request(&ctx, Request::MonitorJob { id: job.id.clone() }).await
    else {
        panic!("expected sample");
    };
    assert!(sample.is_none());
}

#[tokio::test]
async fn cleanup_counts_removed_jobs() {
    let (ctx, _due) = ready_ctx();
    let Response::Job { job } =
        handle_request(&ctx, Request::CreateJob { spec: JobSpec::new("echo x") }).await
    else {
        panic!("create failed");
    };
    handle_request(&ctx, Request::StartJob { id: job.id.clone() }).await;
    wait_terminal(&ctx, &job.id).await;

    // Zero-age cutoff sweeps everything already terminal.
    tokio::time::sleep(Duration::from_millis(10)).await;
    let response = handle_request(&ctx, Request::CleanupJobs { older_than_ms: 0 }).await;
    assert_eq!(response, Response::Count { count: 1 });
}

#[tokio::test]
async fn stats_cover_store_and_scheduler() {
    let (ctx, _due) = ready_ctx();
    handle_request(
        &ctx,
        Request::CreateJob {
            spec: JobSpec::new("echo tick").schedule(Schedule::interval(60_000)),
        },
    )
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let Response::Stats { stats } = handle_request(&ctx, Request::Stats).await else {
        panic!("expected stats");
    };
    assert_eq!(stats.store.total, 1);
    assert_eq!(stats.scheduler.jobs_scheduled, 1);
}

#[tokio::test]
async fn draining_refuses_new_work_but_allows_queries() {
    let (ctx, _due) = ready_ctx();
    let Response::Job { job } =
        handle_request(&ctx, Request::CreateJob { spec: JobSpec::new("true") }).await
    else {
        panic!("create failed");
    };

    ctx.phase.send_replace(Phase::Draining);

    let refused = handle_request(&ctx, Request::CreateJob { spec: JobSpec::new("true") }).await;
    assert!(refused.is_error());
    let refused = handle_request(&ctx, Request::StartJob { id: job.id.clone() }).await;
    assert!(refused.is_error());

    let listed = handle_request(&ctx, Request::ListJobs { filter: Default::default() }).await;
    let Response::Jobs { jobs } = listed else {
        panic!("queries still served while draining");
    };
    assert_eq!(jobs.len(), 1);
}

#[tokio::test]
async fn shutdown_notifies_the_main_loop() {
    let (ctx, _due) = ready_ctx();
    let notified = ctx.shutdown.clone();
    let waiter = tokio::spawn(async move { notified.notified().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let response = handle_request(&ctx, Request::Shutdown).await;
    assert_eq!(response, Response::ShuttingDown);
    waiter.await.expect("main loop woke up");
}

#[tokio::test]
async fn due_dispatch_restarts_scheduled_jobs_each_fire() {
    let (ctx, _due) = ready_ctx();
    let Response::Job { job } = handle_request(
        &ctx,
        Request::CreateJob {
            spec: JobSpec::new("echo tick").schedule(Schedule::interval(100_000)),
        },
    )
    .await
    else {
        panic!("create failed");
    };

    // First fire runs the created job to completion.
    dispatch_due(
        &ctx,
        crate::scheduler::Due { job_id: job.id.clone(), name: job.name.clone(), at_epoch_ms: 0 },
    )
    .await;
    let done = wait_terminal(&ctx, &job.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    let first_pid = done.pid;

    // Second fire rearms the terminal job and runs it again.
    dispatch_due(
        &ctx,
        crate::scheduler::Due { job_id: job.id.clone(), name: job.name.clone(), at_epoch_ms: 0 },
    )
    .await;
    let done = wait_terminal(&ctx, &job.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_ne!(done.pid, first_pid, "each fire is a fresh spawn");
}

#[tokio::test]
async fn due_dispatch_for_a_removed_job_is_tolerated() {
    let (ctx, _due) = ready_ctx();
    dispatch_due(
        &ctx,
        crate::scheduler::Due { job_id: "job_404".into(), name: "ghost".into(), at_epoch_ms: 0 },
    )
    .await;
    // Nothing exploded; nothing was created.
    assert_eq!(ctx.store.stats().total, 0);
}
