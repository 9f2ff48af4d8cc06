// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain-text rendering for command output.

use anyhow::Result;
use lsh_core::Job;
use lsh_daemon::protocol::DaemonStats;
use lsh_daemon::{ProcessInfo, ProcessSample};

pub fn job_table(jobs: &[Job], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(jobs)?);
        return Ok(());
    }
    if jobs.is_empty() {
        println!("no jobs");
        return Ok(());
    }
    println!(
        "{:<10} {:<20} {:<10} {:<9} {:>8}  {}",
        "ID", "NAME", "STATUS", "TYPE", "PID", "COMMAND"
    );
    for job in jobs {
        println!(
            "{:<10} {:<20} {:<10} {:<9} {:>8}  {}",
            job.id,
            truncate(&job.name, 20),
            job.status.to_string(),
            job.kind.to_string(),
            job.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
            truncate(&job.command, 40),
        );
    }
    Ok(())
}

pub fn job_detail(job: &Job, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(job)?);
        return Ok(());
    }
    println!("id:          {}", job.id);
    println!("name:        {}", job.name);
    println!("type:        {}", job.kind);
    println!("status:      {}", job.status);
    println!("command:     {}", job.command);
    if !job.argv.is_empty() {
        println!("argv:        {}", job.argv.join(" "));
    }
    println!("cwd:         {}", job.cwd.display());
    println!("user:        {}", job.user);
    if let Some(schedule) = &job.schedule {
        if let Some(cron) = &schedule.cron {
            println!("cron:        {cron}");
        }
        if let Some(interval) = schedule.interval_ms {
            println!("interval:    {interval}ms");
        }
    }
    if let Some(priority) = job.priority {
        println!("priority:    {priority}");
    }
    if let Some(timeout) = job.timeout_ms {
        println!("timeout:     {timeout}ms");
    }
    println!("created_at:  {}", job.created_at.to_rfc3339());
    if let Some(at) = job.started_at {
        println!("started_at:  {}", at.to_rfc3339());
    }
    if let Some(at) = job.completed_at {
        println!("completed_at: {}", at.to_rfc3339());
    }
    if let Some(pid) = job.pid {
        println!("pid:         {pid}");
    }
    if let Some(code) = job.exit_code {
        println!("exit_code:   {code}");
    }
    if !job.tags.is_empty() {
        let tags: Vec<&str> = job.tags.iter().map(|t| t.as_str()).collect();
        println!("tags:        {}", tags.join(", "));
    }
    if let Some(description) = &job.description {
        println!("description: {description}");
    }
    if !job.stdout.is_empty() {
        println!("--- stdout ---");
        print!("{}", job.stdout);
    }
    if !job.stderr.is_empty() {
        println!("--- stderr ---");
        print!("{}", job.stderr);
    }
    Ok(())
}

pub fn sample(sample: Option<&ProcessSample>) {
    match sample {
        None => println!("process not found (job not running)"),
        Some(s) => {
            println!(
                "pid {}  ppid {}  cpu {:.1}%  mem {:.1}%  elapsed {}s  state {}",
                s.pid,
                s.ppid.map(|p| p.to_string()).unwrap_or_else(|| "-".into()),
                s.cpu_pct,
                s.mem_pct,
                s.elapsed_secs,
                s.state,
            );
        }
    }
}

pub fn processes(processes: &[ProcessInfo], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(processes)?);
        return Ok(());
    }
    println!("{:>8} {:>8} {:>6} {:>12}  {}", "PID", "PPID", "CPU%", "MEM", "NAME");
    for p in processes {
        println!(
            "{:>8} {:>8} {:>6.1} {:>12}  {}",
            p.pid,
            p.ppid.map(|v| v.to_string()).unwrap_or_else(|| "-".into()),
            p.cpu_pct,
            format_bytes(p.mem_bytes),
            p.name,
        );
    }
    Ok(())
}

pub fn stats(stats: &DaemonStats) {
    println!("jobs:       {}", stats.store.total);
    println!("  running:    {}", stats.store.running);
    println!("  completed:  {}", stats.store.completed);
    println!("  failed:     {}", stats.store.failed);
    for (status, count) in &stats.store.by_status {
        println!("  {status:<11} {count}");
    }
    println!("scheduler:");
    println!("  scheduled:  {}", stats.scheduler.jobs_scheduled);
    println!("  ticks:      {}", stats.scheduler.total_ticks);
    println!("  fired:      {}", stats.scheduler.total_fired);
    println!("  avg tick:   {}us", stats.scheduler.avg_tick_micros);
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max.saturating_sub(1);
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &s[..end])
    }
}


fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;
    match bytes {
        b if b >= GIB => format!("{:.1}GiB", b as f64 / GIB as f64),
        b if b >= MIB => format!("{:.1}MiB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1}KiB", b as f64 / KIB as f64),
        b => format!("{b}B"),
    }
}
