// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC client: one connection per command.

use crate::args::{Cli, Commands, CreateArgs, DaemonCommands, JobCommands, ListArgs, UpdateArgs};
use crate::render;
use anyhow::{bail, Context, Result};
use lsh_core::{Job, JobFilter, JobPatch, JobSpec, JobStatus, JobType, Schedule};
use lsh_daemon::protocol::{read_response, write_request, Request, Response};
use std::collections::HashMap;
use tokio::net::UnixStream;

/// Send one request to the daemon and return its response.
pub async fn send(request: &Request) -> Result<Response> {
    let path = lsh_daemon::env::socket_path();
    let mut stream = UnixStream::connect(&path).await.with_context(|| {
        format!("daemon not reachable at {} (is lshd running?)", path.display())
    })?;
    let timeout = lsh_daemon::env::ipc_timeout();
    write_request(&mut stream, request, timeout).await?;
    Ok(read_response(&mut stream, timeout).await?)
}

fn expect_job(response: Response) -> Result<Job> {
    match response {
        Response::Job { job } => Ok(job),
        Response::Error { kind, message } => bail!("{kind}: {message}"),
        other => bail!("unexpected response: {other:?}"),
    }
}

fn parse_status(s: &str) -> Result<JobStatus> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .with_context(|| format!("unknown status `{s}`"))
}

fn parse_kind(s: &str) -> Result<JobType> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .with_context(|| format!("unknown job type `{s}`"))
}

fn parse_env(pairs: &[String]) -> Result<HashMap<String, String>> {
    let mut env = HashMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("--env takes KEY=VALUE, got `{pair}`");
        };
        env.insert(key.to_string(), value.to_string());
    }
    Ok(env)
}

fn build_spec(args: &CreateArgs) -> Result<JobSpec> {
    let mut spec = JobSpec::new(args.command.clone()).kind(parse_kind(&args.kind)?);
    spec.id = args.id.clone();
    spec.name = args.name.clone();
    spec.argv = args.argv.clone();
    spec.cwd = args.cwd.clone();
    spec.env = parse_env(&args.env)?;
    spec.user = args.user.clone();
    spec.priority = args.priority;
    spec.timeout_ms = args.timeout_ms;
    spec.log_file = args.log_file.clone();
    spec.tags = args.tags.iter().cloned().collect();
    spec.description = args.description.clone();
    if args.cron.is_some() || args.interval_ms.is_some() {
        spec.schedule = Some(Schedule {
            cron: args.cron.clone(),
            interval_ms: args.interval_ms,
            next_run: None,
        });
    }
    Ok(spec)
}

fn build_patch(args: &UpdateArgs) -> JobPatch {
    JobPatch {
        name: args.name.clone(),
        priority: args.priority,
        max_memory: args.max_memory,
        max_cpu: args.max_cpu,
        timeout_ms: args.timeout_ms,
        tags: if args.tags.is_empty() { None } else { Some(args.tags.iter().cloned().collect()) },
        description: args.description.clone(),
        schedule: if args.cron.is_some() || args.interval_ms.is_some() {
            Some(Schedule {
                cron: args.cron.clone(),
                interval_ms: args.interval_ms,
                next_run: None,
            })
        } else {
            None
        },
    }
}

fn build_filter(args: &ListArgs) -> Result<JobFilter> {
    Ok(JobFilter {
        statuses: args.statuses.iter().map(|s| parse_status(s)).collect::<Result<_>>()?,
        kinds: args.kinds.iter().map(|s| parse_kind(s)).collect::<Result<_>>()?,
        tags: args.tags.clone(),
        user: args.user.clone(),
        name_pattern: args.name_pattern.clone(),
        created_after: None,
        created_before: None,
    })
}

/// Execute one parsed command.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Job { command } => run_job(command).await,
        Commands::Ps { json } => {
            match send(&Request::Processes).await? {
                Response::Processes { processes } => render::processes(&processes, json)?,
                Response::Error { kind, message } => bail!("{kind}: {message}"),
                other => bail!("unexpected response: {other:?}"),
            }
            Ok(())
        }
        Commands::Stats => {
            match send(&Request::Stats).await? {
                Response::Stats { stats } => render::stats(&stats),
                Response::Error { kind, message } => bail!("{kind}: {message}"),
                other => bail!("unexpected response: {other:?}"),
            }
            Ok(())
        }
        Commands::Daemon { command } => run_daemon(command).await,
    }
}

async fn run_job(command: JobCommands) -> Result<()> {
    match command {
        JobCommands::Create(args) => {
            let start = args.start;
            let spec = build_spec(&args)?;
            let job = expect_job(send(&Request::CreateJob { spec }).await?)?;
            println!("created {}", job.id);
            if start {
                let job = expect_job(send(&Request::StartJob { id: job.id }).await?)?;
                println!("started {} (pid {})", job.id, job.pid.unwrap_or_default());
            }
        }
        JobCommands::List(args) => {
            let filter = build_filter(&args)?;
            match send(&Request::ListJobs { filter }).await? {
                Response::Jobs { jobs } => render::job_table(&jobs, args.json)?,
                Response::Error { kind, message } => bail!("{kind}: {message}"),
                other => bail!("unexpected response: {other:?}"),
            }
        }
        JobCommands::Show { id, json } => {
            let job = expect_job(send(&Request::GetJob { id }).await?)?;
            render::job_detail(&job, json)?;
        }
        JobCommands::Start { id } => {
            let job = expect_job(send(&Request::StartJob { id }).await?)?;
            println!("started {} (pid {})", job.id, job.pid.unwrap_or_default());
        }
        JobCommands::Stop { id, signal } => {
            let job = expect_job(send(&Request::StopJob { id, signal }).await?)?;
            println!("stopped {}", job.id);
        }
        JobCommands::Pause { id } => {
            let job = expect_job(send(&Request::PauseJob { id }).await?)?;
            println!("paused {}", job.id);
        }
        JobCommands::Resume { id } => {
            let job = expect_job(send(&Request::ResumeJob { id }).await?)?;
            println!("resumed {}", job.id);
        }
        JobCommands::Kill { id, signal } => {
            let job = expect_job(send(&Request::KillJob { id, signal }).await?)?;
            println!("killed {}", job.id);
        }
        JobCommands::Update(args) => {
            let id = args.id.clone();
            let patch = build_patch(&args);
            let job = expect_job(send(&Request::UpdateJob { id, patch }).await?)?;
            println!("updated {}", job.id);
        }
        JobCommands::Rm { id, force } => match send(&Request::RemoveJob { id, force }).await? {
            Response::Removed { .. } => println!("removed"),
            Response::Error { kind, message } => bail!("{kind}: {message}"),
            other => bail!("unexpected response: {other:?}"),
        },
        JobCommands::Watch { id } => match send(&Request::MonitorJob { id }).await? {
            Response::Sample { sample } => render::sample(sample.as_ref()),
            Response::Error { kind, message } => bail!("{kind}: {message}"),
            other => bail!("unexpected response: {other:?}"),
        },
        JobCommands::Cleanup { older_than_secs } => {
            match send(&Request::CleanupJobs { older_than_ms: older_than_secs * 1_000 }).await? {
                Response::Count { count } => println!("removed {count} job(s)"),
                Response::Error { kind, message } => bail!("{kind}: {message}"),
                other => bail!("unexpected response: {other:?}"),
            }
        }
    }
    Ok(())
}

async fn run_daemon(command: DaemonCommands) -> Result<()> {
    match command {
        DaemonCommands::Run => {
            let config = lsh_daemon::Config::load()?;
            std::fs::create_dir_all(&config.state_dir)?;
            let (daemon, listener) = lsh_daemon::startup(&config).await?;
            println!("READY");
            daemon.run(listener).await?;
        }
        DaemonCommands::Stop => match send(&Request::Shutdown).await? {
            Response::ShuttingDown => println!("daemon is draining"),
            other => bail!("unexpected response: {other:?}"),
        },
        DaemonCommands::Status => match send(&Request::Ping).await {
            Ok(Response::Pong) => println!("daemon is up"),
            Ok(other) => bail!("unexpected response: {other:?}"),
            Err(e) => {
                println!("daemon is down ({e:#})");
                std::process::exit(1);
            }
        },
    }
    Ok(())
}
