// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane protocol between the daemon and its clients.
//!
//! Each exchange is one frame per direction: a 4-byte big-endian payload
//! length followed by that many bytes of JSON. Frames are capped so a
//! job listing with full capture buffers still fits, while a runaway
//! peer can never make the daemon buffer arbitrary amounts.

mod request;
mod response;

pub use request::Request;
pub use response::{DaemonStats, Response};

use crate::store::CAPTURE_LIMIT;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Bytes reserved for the frame's length prefix.
const FRAME_HEADER: usize = 4;

/// Upper bound on a frame's payload, derived from the capture bound: a
/// job record tops out at two full capture buffers, and a listing of
/// eight such jobs (plus metadata) must still go out in one frame.
pub const MAX_FRAME_BYTES: usize = 8 * 2 * CAPTURE_LIMIT;

/// Errors surfaced by the framing layer.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("connection i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("undecodable frame payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("frame of {got} bytes exceeds the {limit} byte cap")]
    Oversized { got: usize, limit: usize },

    #[error("peer closed the connection")]
    Closed,

    #[error("peer missed the {0:?} deadline")]
    Deadline(Duration),
}

/// Serialize a value into a complete frame, length prefix included.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut frame = vec![0u8; FRAME_HEADER];
    serde_json::to_writer(&mut frame, value)?;
    let payload = frame.len() - FRAME_HEADER;
    if payload > MAX_FRAME_BYTES {
        return Err(ProtocolError::Oversized { got: payload, limit: MAX_FRAME_BYTES });
    }
    frame[..FRAME_HEADER].copy_from_slice(&(payload as u32).to_be_bytes());
    Ok(frame)
}

/// Deserialize a frame payload (prefix already stripped).
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ProtocolError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Read one request frame, bounded by `deadline`.
pub async fn read_request<R>(reader: &mut R, deadline: Duration) -> Result<Request, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    decode(&with_deadline(deadline, recv_frame(reader)).await?)
}

/// Write one request frame, bounded by `deadline`.
pub async fn write_request<W>(
    writer: &mut W,
    request: &Request,
    deadline: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(request)?;
    with_deadline(deadline, send_frame(writer, &frame)).await
}

/// Read one response frame, bounded by `deadline`.
pub async fn read_response<R>(
    reader: &mut R,
    deadline: Duration,
) -> Result<Response, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    decode(&with_deadline(deadline, recv_frame(reader)).await?)
}

/// Write one response frame, bounded by `deadline`.
pub async fn write_response<W>(
    writer: &mut W,
    response: &Response,
    deadline: Duration,
) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(response)?;
    with_deadline(deadline, send_frame(writer, &frame)).await
}

async fn send_frame<W>(writer: &mut W, frame: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await?;
    Ok(())
}

async fn recv_frame<R>(reader: &mut R) -> Result<Vec<u8>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER];
    read_fully(reader, &mut header).await?;
    let payload = u32::from_be_bytes(header) as usize;
    if payload > MAX_FRAME_BYTES {
        return Err(ProtocolError::Oversized { got: payload, limit: MAX_FRAME_BYTES });
    }
    let mut buf = vec![0u8; payload];
    read_fully(reader, &mut buf).await?;
    Ok(buf)
}

/// `read_exact` with a clean EOF folded into [`ProtocolError::Closed`].
async fn read_fully<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), ProtocolError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(ProtocolError::Closed),
        Err(e) => Err(ProtocolError::Io(e)),
    }
}

async fn with_deadline<T>(
    deadline: Duration,
    op: impl Future<Output = Result<T, ProtocolError>>,
) -> Result<T, ProtocolError> {
    tokio::time::timeout(deadline, op)
        .await
        .map_err(|_| ProtocolError::Deadline(deadline))?
}


#[cfg(test)]
#[path = "roundtrip_tests.rs"]
mod roundtrip_tests;
