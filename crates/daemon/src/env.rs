// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

/// Default path of the persisted job snapshot (§ persisted state layout).
pub const DEFAULT_JOBS_FILE: &str = "/tmp/lsh-jobs.json";

/// Resolve state directory: LSH_STATE_DIR > XDG_STATE_HOME/lsh > ~/.local/state/lsh
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("LSH_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("lsh"));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".local/state/lsh"))
}

/// Path of the job snapshot file (`LSH_JOBS_FILE` overrides the default).
pub fn jobs_file() -> PathBuf {
    std::env::var("LSH_JOBS_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_JOBS_FILE))
}

/// Current user name, for socket naming and job ownership defaults.
pub fn user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Host name, exposed to spawned jobs that ask for it.
pub fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

/// Shell used for `type=shell` spawns: LSH_SHELL > SHELL > /bin/sh.
#[cfg(unix)]
pub fn shell_program() -> String {
    std::env::var("LSH_SHELL")
        .or_else(|_| std::env::var("SHELL"))
        .unwrap_or_else(|_| "/bin/sh".to_string())
}

#[cfg(not(unix))]
pub fn shell_program() -> String {
    std::env::var("LSH_SHELL")
        .or_else(|_| std::env::var("COMSPEC"))
        .unwrap_or_else(|_| "cmd.exe".to_string())
}

/// Control socket path: a socket file under the temp directory on Unix,
/// a named pipe path elsewhere.
#[cfg(unix)]
pub fn socket_path() -> PathBuf {
    std::env::temp_dir().join(format!("lsh-daemon-{}.sock", user()))
}

#[cfg(not(unix))]
pub fn socket_path() -> PathBuf {
    PathBuf::from(format!(r"\\.\pipe\lsh-daemon-{}", user()))
}

/// Default IPC timeout (`LSH_IPC_TIMEOUT_MS`).
pub fn ipc_timeout() -> Duration {
    std::env::var("LSH_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

/// Shutdown drain grace period (`LSH_DRAIN_TIMEOUT_MS`, default 5s).
pub fn drain_timeout() -> Duration {
    std::env::var("LSH_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
