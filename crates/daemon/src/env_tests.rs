// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn jobs_file_default_and_override() {
    std::env::remove_var("LSH_JOBS_FILE");
    assert_eq!(jobs_file(), PathBuf::from(DEFAULT_JOBS_FILE));

    std::env::set_var("LSH_JOBS_FILE", "/tmp/other.json");
    assert_eq!(jobs_file(), PathBuf::from("/tmp/other.json"));
    std::env::remove_var("LSH_JOBS_FILE");
}

#[test]
#[serial]
fn state_dir_prefers_explicit_override() {
    std::env::set_var("LSH_STATE_DIR", "/tmp/lsh-state");
    assert_eq!(state_dir(), Some(PathBuf::from("/tmp/lsh-state")));
    std::env::remove_var("LSH_STATE_DIR");
}

#[test]
#[serial]
fn ipc_timeout_parses_millis() {
    std::env::set_var("LSH_IPC_TIMEOUT_MS", "250");
    assert_eq!(ipc_timeout(), Duration::from_millis(250));
    std::env::remove_var("LSH_IPC_TIMEOUT_MS");
    assert_eq!(ipc_timeout(), Duration::from_secs(5));
}

#[cfg(unix)]
#[test]
#[serial]
fn socket_path_lives_in_temp_dir() {
    let path = socket_path();
    assert!(path.starts_with(std::env::temp_dir()));
    assert!(path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("lsh-daemon-") && n.ends_with(".sock")));
}

#[cfg(unix)]
#[test]
#[serial]
fn shell_program_honors_override() {
    std::env::set_var("LSH_SHELL", "/bin/bash");
    assert_eq!(shell_program(), "/bin/bash");
    std::env::remove_var("LSH_SHELL");
}
