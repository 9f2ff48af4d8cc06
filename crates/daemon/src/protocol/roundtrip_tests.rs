// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serde roundtrips over every protocol variant with minimal fixed
//! field values.

use super::*;
use crate::monitor::ProcessSample;
use lsh_core::test_support::job;
use lsh_core::JobSpec;

fn s() -> String {
    String::new()
}

fn all_requests() -> Vec<Request> {
    vec![
        Request::Ping,
        Request::CreateJob { spec: JobSpec::new("true") },
        Request::StartJob { id: s() },
        Request::StopJob { id: s(), signal: Some(15) },
        Request::PauseJob { id: s() },
        Request::ResumeJob { id: s() },
        Request::KillJob { id: s(), signal: None },
        Request::ListJobs { filter: Default::default() },
        Request::GetJob { id: s() },
        Request::UpdateJob { id: s(), patch: Default::default() },
        Request::RemoveJob { id: s(), force: true },
        Request::MonitorJob { id: s() },
        Request::Processes,
        Request::CleanupJobs { older_than_ms: 0 },
        Request::Stats,
        Request::Shutdown,
    ]
}

fn all_responses() -> Vec<Response> {
    vec![
        Response::Pong,
        Response::Job { job: job("job_1") },
        Response::Jobs { jobs: vec![job("job_1"), job("job_2")] },
        Response::Removed { removed: true },
        Response::Sample { sample: None },
        Response::Sample {
            sample: Some(ProcessSample {
                pid: 1,
                ppid: Some(0),
                cpu_pct: 0.0,
                mem_pct: 0.0,
                elapsed_secs: 1,
                state: "S".into(),
            }),
        },
        Response::Processes { processes: vec![] },
        Response::Count { count: 3 },
        Response::Stats { stats: Default::default() },
        Response::ShuttingDown,
        Response::Error { kind: "not_found".into(), message: "job not found".into() },
    ]
}

#[test]
fn every_request_roundtrips() {
    for request in all_requests() {
        let frame = encode(&request).unwrap();
        let back: Request = decode(&frame[FRAME_HEADER..]).unwrap();
        assert_eq!(back, request);
    }
}

#[test]
fn every_response_roundtrips() {
    for response in all_responses() {
        let frame = encode(&response).unwrap();
        let back: Response = decode(&frame[FRAME_HEADER..]).unwrap();
        assert_eq!(back, response);
    }
}

#[test]
fn job_error_maps_to_typed_error_response() {
    let response: Response = lsh_core::JobError::NotFound("job_9".into()).into();
    match response {
        Response::Error { kind, message } => {
            assert_eq!(kind, "not_found");
            assert!(message.contains("job_9"));
        }
        other => panic!("expected error response, got {other:?}"),
    }
}
