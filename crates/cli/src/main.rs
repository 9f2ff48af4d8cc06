// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! lsh: command-line client for the LSH job daemon.
//!
//! Thin mapping from subcommands onto the daemon's IPC control API. The
//! interactive shell surface lives elsewhere; this binary is strictly
//! non-interactive.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod args;
#[cfg(unix)]
mod client;
mod render;

use clap::Parser;

#[cfg(unix)]
#[tokio::main]
async fn main() {
    let cli = args::Cli::parse();
    if let Err(e) = client::run(cli).await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(not(unix))]
fn main() {
    // Parse so --help still works, then refuse.
    let _ = args::Cli::parse();
    eprintln!("lsh requires a Unix host; the named-pipe transport is not wired up");
    std::process::exit(1);
}
