//! Connection pair lifecycle and the two directional forwarding loops.
//!
//! # Responsibilities
//! - Bind one accepted client connection to one dialed upstream connection
//! - Request direction: frame, strip instructions, splice, forward
//! - Reply direction: frame, correlate via the registry, execute actions on
//!   the first matching reply, then degrade to raw byte copying
//! - Close both connections when either direction terminates

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::instruction::codec::{intercept_request, InstructionError, Intercept};
use crate::instruction::{executor, ConnectionId, PendingInstructions};
use crate::net::tls::UpstreamStream;
use crate::wire::{read_message, WireError};

/// Error type for one directional loop. All variants are contained to the
/// owning connection pair.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Instruction(#[from] InstructionError),

    #[error("write failed: {0}")]
    Write(std::io::Error),
}

/// Run one connection pair to completion.
///
/// The two directional loops run concurrently over the same two
/// connections; each connection is read by exactly one loop and written by
/// exactly one loop. When either loop returns, the pair tears down and
/// both connections close.
pub async fn run_pair(
    client: TcpStream,
    client_addr: SocketAddr,
    upstream: Box<dyn UpstreamStream>,
    registry: Arc<PendingInstructions>,
) {
    let id = ConnectionId::next();
    let (client_read, client_write) = client.into_split();
    let (upstream_read, upstream_write) = tokio::io::split(upstream);

    tracing::debug!(%id, peer_addr = %client_addr, "connection pair started");

    tokio::select! {
        result = request_direction(client_read, upstream_write, &registry, id) => {
            log_outcome("client→upstream", client_addr, id, result);
        }
        result = reply_direction(upstream_read, client_write, &registry, id) => {
            log_outcome("upstream→client", client_addr, id, result);
        }
    }

    registry.discard(id);
}

fn log_outcome(
    direction: &str,
    peer: SocketAddr,
    id: ConnectionId,
    result: Result<(), ConnectionError>,
) {
    match result {
        Ok(()) => tracing::debug!(%id, peer_addr = %peer, direction, "direction closed"),
        Err(e) => tracing::warn!(%id, peer_addr = %peer, direction, error = %e, "direction failed"),
    }
}

/// Client → upstream: intercept instructions and forward cleaned requests.
async fn request_direction(
    mut src: OwnedReadHalf,
    mut dst: WriteHalf<Box<dyn UpstreamStream>>,
    registry: &PendingInstructions,
    id: ConnectionId,
) -> Result<(), ConnectionError> {
    loop {
        let raw = match read_message(&mut src).await? {
            Some(raw) => raw,
            None => return Ok(()),
        };

        match intercept_request(&raw)? {
            Intercept::PassThrough => {
                dst.write_all(&raw).await.map_err(ConnectionError::Write)?;
            }
            Intercept::Stripped {
                message,
                instruction,
            } => {
                tracing::debug!(%id, actions = instruction.actions.len(), "instruction intercepted");
                registry.set(id, instruction);
                dst.write_all(&message)
                    .await
                    .map_err(ConnectionError::Write)?;
            }
        }
    }
}

/// Upstream → client: correlate the first pending instruction, apply it,
/// then fall back to unexamined byte copying for the rest of the session.
async fn reply_direction(
    mut src: ReadHalf<Box<dyn UpstreamStream>>,
    mut dst: OwnedWriteHalf,
    registry: &PendingInstructions,
    id: ConnectionId,
) -> Result<(), ConnectionError> {
    loop {
        let raw = match read_message(&mut src).await? {
            Some(raw) => raw,
            None => return Ok(()),
        };

        match registry.take(id) {
            None => {
                // not the targeted reply; stay transparent
                dst.write_all(&raw).await.map_err(ConnectionError::Write)?;
            }
            Some(instruction) => {
                tracing::debug!(%id, actions = instruction.actions.len(), "applying instruction to reply");
                executor::apply(&raw, &mut dst, &instruction.actions)
                    .await
                    .map_err(ConnectionError::Write)?;
                break;
            }
        }
    }

    // At most one reply per cycle is ever instrumented; copy the rest of
    // the session without framing.
    tokio::io::copy(&mut src, &mut dst)
        .await
        .map_err(ConnectionError::Write)?;

    // Half-close toward the client so in-flight bytes still drain.
    dst.shutdown().await.map_err(ConnectionError::Write)?;
    Ok(())
}
