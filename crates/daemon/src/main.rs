// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LSH job daemon (lshd)
//!
//! Background process owning the job store, process supervisor, and
//! scheduler. Listens on a Unix socket for control requests from the
//! `lsh` CLI.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use lsh_daemon::{startup, Config};
use tracing::{error, info};

#[cfg(unix)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("lshd {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                print_help();
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: lshd [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    std::fs::create_dir_all(&config.state_dir)?;
    let _log_guard = setup_logging(&config)?;

    info!("starting daemon");
    let (daemon, listener) = match startup(&config).await {
        Ok(pair) => pair,
        Err(e @ lsh_daemon::LifecycleError::LockFailed(_)) => {
            let pid = std::fs::read_to_string(&config.lock_path).unwrap_or_default();
            eprintln!("lshd is already running");
            if !pid.trim().is_empty() {
                eprintln!("  pid: {}", pid.trim());
            }
            error!("startup refused: {e}");
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to start daemon: {e}");
            return Err(e.into());
        }
    };

    // Signal readiness for whoever spawned us (CLI, service manager).
    println!("READY");

    daemon.run(listener).await?;
    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("lshd requires a Unix host; the named-pipe transport is not wired up");
    std::process::exit(1);
}

#[cfg(unix)]
fn print_help() {
    println!("lshd {}", env!("CARGO_PKG_VERSION"));
    println!("LSH job daemon - supervises shell-spawned jobs and their schedules");
    println!();
    println!("USAGE:");
    println!("    lshd");
    println!();
    println!("The daemon is typically started by the `lsh` CLI and should not");
    println!("be invoked directly. It listens on a Unix socket for commands.");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Print help information");
    println!("    -v, --version    Print version information");
    println!();
    println!("ENVIRONMENT:");
    println!("    LSH_JOBS_FILE         Snapshot path (default /tmp/lsh-jobs.json)");
    println!("    LSH_STATE_DIR         State directory for logs and pid file");
    println!("    LSH_LOG               Log filter (tracing EnvFilter syntax)");
    println!("    LSH_DRAIN_TIMEOUT_MS  Grace period before hard-killing on shutdown");
}

#[cfg(unix)]
fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LSH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}
