//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;

use bson::Document;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::sync::mpsc;

use mongo_fault_proxy::config::ProxyConfig;
use mongo_fault_proxy::net::{Listener, ProxyServer};
use mongo_fault_proxy::Shutdown;

pub const HEADER_LEN: usize = 16;
pub const OP_MSG: i32 = 2013;

/// Byte offset of the first section's document inside an OP_MSG.
pub const DOC_OFFSET: usize = HEADER_LEN + 4 + 1;

/// Encode a command document as a single-section OP_MSG.
pub fn op_msg(doc: &Document, request_id: i32, response_to: i32) -> Vec<u8> {
    let body = bson::to_vec(doc).unwrap();
    let total = DOC_OFFSET + body.len();
    let mut msg = Vec::with_capacity(total);
    msg.extend_from_slice(&(total as i32).to_le_bytes());
    msg.extend_from_slice(&request_id.to_le_bytes());
    msg.extend_from_slice(&response_to.to_le_bytes());
    msg.extend_from_slice(&OP_MSG.to_le_bytes());
    msg.extend_from_slice(&0u32.to_le_bytes());
    msg.push(0); // section kind: single document
    msg.extend_from_slice(&body);
    msg
}

/// Decode the first section's document out of an OP_MSG buffer.
pub fn first_document(msg: &[u8]) -> Document {
    Document::from_reader(&mut &msg[DOC_OFFSET..]).unwrap()
}

/// Read one length-prefixed frame; `None` on clean close.
pub async fn read_frame<R: AsyncRead + Unpin>(src: &mut R) -> Option<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    src.read_exact(&mut len_buf).await.ok()?;
    let total = u32::from_le_bytes(len_buf) as usize;
    let mut msg = vec![0u8; total];
    msg[..4].copy_from_slice(&len_buf);
    src.read_exact(&mut msg[4..]).await.ok()?;
    Some(msg)
}

/// Start a mock upstream server.
///
/// For every framed request it receives, it forwards the raw request bytes
/// on the channel and answers with an `{ok: 1}` reply correlated to the
/// request id.
pub async fn start_mock_upstream(requests: mpsc::UnboundedSender<Vec<u8>>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let requests = requests.clone();
            tokio::spawn(async move {
                while let Some(raw) = read_frame(&mut socket).await {
                    let request_id = i32::from_le_bytes(raw[4..8].try_into().unwrap());
                    let _ = requests.send(raw);
                    let reply = op_msg(&bson::doc! { "ok": 1.0 }, 900, request_id);
                    if socket.write_all(&reply).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    addr
}

/// Start the proxy in front of `target_addr` on an ephemeral port.
///
/// Returns the proxy's listen address and the shutdown handle keeping it
/// alive.
pub async fn start_proxy(target_addr: SocketAddr) -> (SocketAddr, Shutdown) {
    let mut config = ProxyConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.target.address = target_addr.to_string();

    let target = mongo_fault_proxy::resolve::resolve_target(&config.target)
        .await
        .unwrap();
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = ProxyServer::new(config, target).unwrap();
    let shutdown = Shutdown::new();
    let stop: broadcast::Receiver<()> = shutdown.subscribe();
    tokio::spawn(server.run(listener, stop));

    (addr, shutdown)
}
