// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared scaffolding for the scenario tests.

use lsh_core::Job;
use lsh_daemon::{Config, Daemon, DaemonCtx, Phase};
use std::path::Path;
use std::time::{Duration, Instant};

/// Build a config rooted in `dir`, with the jobs file at `jobs_path`.
pub fn config_in(dir: &Path, jobs_path: &Path) -> Config {
    Config {
        state_dir: dir.to_path_buf(),
        socket_path: dir.join("daemon.sock"),
        lock_path: dir.join("daemon.pid"),
        log_path: dir.join("daemon.log"),
        jobs_path: jobs_path.to_path_buf(),
    }
}

/// Start a daemon in a fresh state dir inside `dir`.
pub async fn daemon_in(dir: &Path, name: &str, jobs_path: &Path) -> Daemon {
    let state = dir.join(name);
    std::fs::create_dir_all(&state).unwrap();
    let (daemon, _listener) = lsh_daemon::startup(&config_in(&state, jobs_path)).await.unwrap();
    daemon.ctx.phase.send_replace(Phase::Ready);
    daemon
}

/// Poll until the job reaches a terminal status.
pub async fn wait_terminal(ctx: &DaemonCtx, id: &str, within: Duration) -> Job {
    let deadline = Instant::now() + within;
    loop {
        let job = ctx.store.get(id).expect("job exists");
        if job.is_terminal() {
            return job;
        }
        assert!(Instant::now() < deadline, "job {id} did not finish within {within:?}");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Poll until the snapshot file contains `count` jobs.
pub async fn wait_snapshot_len(path: &Path, count: usize, within: Duration) {
    let file = lsh_storage::SnapshotFile::new(path);
    let deadline = Instant::now() + within;
    loop {
        if file.load().len() == count {
            return;
        }
        assert!(
            Instant::now() < deadline,
            "snapshot at {} never reached {count} job(s)",
            path.display()
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
