//! Accept loop tying the listener, resolver output, and connection pairs
//! together.
//!
//! # Responsibilities
//! - Hand each accepted client off to its own pair task immediately
//! - Dial the resolved upstream once per pair, plain or TLS
//! - Keep per-connection failures away from the accept loop

use std::sync::Arc;

use thiserror::Error;

use tokio::sync::broadcast;

use crate::config::ProxyConfig;
use crate::instruction::PendingInstructions;
use crate::net::connection::run_pair;
use crate::net::listener::Listener;
use crate::net::tls::{self, dial_upstream};
use crate::resolve::ResolvedTarget;

/// Error type for server construction.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Building the TLS client configuration failed.
    #[error("TLS client configuration failed: {0}")]
    Tls(#[from] rustls::Error),
}

/// The fault-injection proxy server.
///
/// Owns the single process-wide instruction registry shared by every
/// connection pair.
pub struct ProxyServer {
    config: ProxyConfig,
    target: Arc<ResolvedTarget>,
    registry: Arc<PendingInstructions>,
    tls: Option<Arc<rustls::ClientConfig>>,
}

impl ProxyServer {
    /// Create a server for an already-resolved target.
    ///
    /// The TLS client configuration is built once here, and only when the
    /// target's policy requires TLS.
    pub fn new(config: ProxyConfig, target: ResolvedTarget) -> Result<Self, ServerError> {
        let tls = if target.use_tls {
            Some(tls::client_config()?)
        } else {
            None
        };

        Ok(Self {
            config,
            target: Arc::new(target),
            registry: Arc::new(PendingInstructions::new()),
            tls,
        })
    }

    /// Run the accept loop until the shutdown signal fires.
    ///
    /// Accept errors are logged and the loop continues; only shutdown ends
    /// it. Per-connection work never blocks the next accept.
    pub async fn run(self, listener: Listener, mut stop: broadcast::Receiver<()>) {
        tracing::info!(
            listen = %self.config.listener.bind_address,
            target = %self.target.address(),
            use_tls = self.target.use_tls,
            "proxy serving"
        );

        loop {
            let accepted = tokio::select! {
                _ = stop.recv() => {
                    tracing::info!("shutdown signal received, stopping accept loop");
                    return;
                }
                accepted = listener.accept() => accepted,
            };

            let (client, client_addr, permit) = match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::warn!(error = %e, "accept error");
                    continue;
                }
            };

            let target = self.target.clone();
            let registry = self.registry.clone();
            let tls = self.tls.clone();

            tokio::spawn(async move {
                let _permit = permit;
                match dial_upstream(&target, tls.as_ref()).await {
                    Ok(upstream) => run_pair(client, client_addr, upstream, registry).await,
                    Err(e) => {
                        // abandon this pair only; the client just sees a close
                        tracing::warn!(
                            peer_addr = %client_addr,
                            target = %target.address(),
                            error = %e,
                            "failed to dial upstream"
                        );
                    }
                }
            });
        }
    }
}
