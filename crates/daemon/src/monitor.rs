// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live process sampling and system process enumeration.
//!
//! Best-effort by contract: a job whose process has exited samples as
//! `None`, and enumeration failures surface as an empty list.

use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};

/// One observation of a live job process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSample {
    pub pid: u32,
    pub ppid: Option<u32>,
    pub cpu_pct: f32,
    pub mem_pct: f32,
    pub elapsed_secs: u64,
    pub state: String,
}

/// One row of the system process listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub ppid: Option<u32>,
    pub name: String,
    pub cpu_pct: f32,
    pub mem_bytes: u64,
    pub state: String,
}

/// Sample one process. Two refreshes bracket the minimum CPU interval so
/// `cpu_pct` is a real measurement rather than zero.
pub async fn sample(pid: u32) -> Option<ProcessSample> {
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    system.process(target)?;

    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    system.refresh_memory();

    let process = system.process(target)?;
    let total_memory = system.total_memory();
    Some(ProcessSample {
        pid,
        ppid: process.parent().map(|p| p.as_u32()),
        cpu_pct: process.cpu_usage(),
        mem_pct: if total_memory > 0 {
            process.memory() as f32 / total_memory as f32 * 100.0
        } else {
            0.0
        },
        elapsed_secs: process.run_time(),
        state: process.status().to_string(),
    })
}

/// Enumerate every process the OS will show us.
pub fn system_processes() -> Vec<ProcessInfo> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    let mut out: Vec<ProcessInfo> = system
        .processes()
        .iter()
        .map(|(pid, process)| ProcessInfo {
            pid: pid.as_u32(),
            ppid: process.parent().map(|p| p.as_u32()),
            name: process.name().to_string_lossy().into_owned(),
            cpu_pct: process.cpu_usage(),
            mem_bytes: process.memory(),
            state: process.status().to_string(),
        })
        .collect();
    out.sort_by_key(|p| p.pid);
    out
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
