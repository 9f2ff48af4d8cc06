// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line surface.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lsh", version, about = "LSH job daemon control")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage jobs
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// List OS processes as the daemon sees them
    Ps {
        /// Emit raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Store and scheduler statistics
    Stats,
    /// Manage the daemon process
    Daemon {
        #[command(subcommand)]
        command: DaemonCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum JobCommands {
    /// Create a job
    Create(CreateArgs),
    /// List jobs
    List(ListArgs),
    /// Show one job in full
    Show {
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Start a created or stopped job
    Start { id: String },
    /// Stop a running job (soft terminate by default)
    Stop {
        id: String,
        /// Signal number to send instead of the default
        #[arg(long)]
        signal: Option<i32>,
    },
    /// Pause a running job
    Pause { id: String },
    /// Resume a paused job
    Resume { id: String },
    /// Hard-kill a job
    Kill {
        id: String,
        #[arg(long)]
        signal: Option<i32>,
    },
    /// Update job metadata
    Update(UpdateArgs),
    /// Remove a job record
    Rm {
        id: String,
        /// Kill a live job before removing it
        #[arg(long)]
        force: bool,
    },
    /// Sample the job's live process
    Watch { id: String },
    /// Remove old terminal jobs
    Cleanup {
        /// Age threshold in seconds
        #[arg(long, default_value_t = 3600)]
        older_than_secs: u64,
    },
}

#[derive(Debug, Subcommand)]
pub enum DaemonCommands {
    /// Run the daemon in the foreground
    Run,
    /// Ask a running daemon to shut down
    Stop,
    /// Check whether the daemon is up
    Status,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// Command line to run
    pub command: String,
    #[arg(long)]
    pub id: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    /// Job type: shell, system, scheduled, or service
    #[arg(long = "type", default_value = "shell")]
    pub kind: String,
    /// Extra arguments appended for non-shell jobs
    #[arg(long = "arg")]
    pub argv: Vec<String>,
    #[arg(long)]
    pub cwd: Option<PathBuf>,
    /// Environment overrides, KEY=VALUE
    #[arg(long = "env")]
    pub env: Vec<String>,
    #[arg(long)]
    pub user: Option<String>,
    /// Cron expression (minute hour day month weekday)
    #[arg(long)]
    pub cron: Option<String>,
    /// Fixed re-run interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// Nice-style priority in [-20, 19]
    #[arg(long, allow_hyphen_values = true)]
    pub priority: Option<i32>,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    #[arg(long)]
    pub log_file: Option<PathBuf>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub description: Option<String>,
    /// Start the job immediately after creating it
    #[arg(long)]
    pub start: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Filter by status (repeatable)
    #[arg(long = "status")]
    pub statuses: Vec<String>,
    /// Filter by type (repeatable)
    #[arg(long = "type")]
    pub kinds: Vec<String>,
    /// Filter by tag (repeatable, any match)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub user: Option<String>,
    /// Regex applied to job names
    #[arg(long)]
    pub name_pattern: Option<String>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub priority: Option<i32>,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    #[arg(long)]
    pub max_memory: Option<u64>,
    #[arg(long)]
    pub max_cpu: Option<u32>,
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub cron: Option<String>,
    #[arg(long)]
    pub interval_ms: Option<u64>,
}
