// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener task for handling socket I/O.
//!
//! The listener runs in a spawned task, accepting connections and
//! handling each in its own task. Connections carry exactly one
//! request/response exchange.

use std::sync::Arc;

use crate::daemon::{handle_request, DaemonCtx};
use crate::env;
use crate::protocol::{self, ProtocolError, Request};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

/// Listener accepting control connections on the Unix socket.
#[cfg(unix)]
pub struct Listener {
    unix: tokio::net::UnixListener,
    ctx: Arc<DaemonCtx>,
}

#[cfg(unix)]
impl Listener {
    pub fn new(unix: tokio::net::UnixListener, ctx: Arc<DaemonCtx>) -> Self {
        Self { unix, ctx }
    }

    /// Accept until the task is dropped, one task per connection.
    pub async fn run(self) {
        loop {
            match self.unix.accept().await {
                Ok((stream, _)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        let (reader, writer) = stream.into_split();
                        if let Err(e) = handle_connection(reader, writer, &ctx).await {
                            log_connection_error(e);
                        }
                    });
                }
                Err(e) => error!("accept error: {}", e),
            }
        }
    }
}

#[cfg(unix)]
fn log_connection_error(e: ProtocolError) {
    match e {
        ProtocolError::Closed => debug!("client disconnected"),
        ProtocolError::Deadline(_) => debug!("connection timed out"),
        _ => error!("connection error: {}", e),
    }
}

/// Handle a single client connection: one request, one response.
///
/// Generic over reader/writer so tests can drive it with in-memory pipes.
pub async fn handle_connection<R, W>(
    mut reader: R,
    mut writer: W,
    ctx: &DaemonCtx,
) -> Result<(), ProtocolError>
where
    R: AsyncRead + AsyncReadExt + Unpin,
    W: AsyncWrite + AsyncWriteExt + Unpin,
{
    let request = protocol::read_request(&mut reader, env::ipc_timeout()).await?;

    // Queries poll frequently; log them quieter than mutations.
    if matches!(
        request,
        Request::Ping | Request::ListJobs { .. } | Request::GetJob { .. } | Request::Stats
    ) {
        debug!(request = ?request, "received query");
    } else {
        info!(request = ?request, "received request");
    }

    let response = handle_request(ctx, request).await;
    protocol::write_response(&mut writer, &response, env::ipc_timeout()).await
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
