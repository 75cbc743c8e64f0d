//! Upstream dialing, plain TCP or TLS.
//!
//! The TLS client configuration uses the Mozilla root store with the ring
//! provider; the resolver decides *whether* to dial with TLS, this module
//! decides *how*.

use std::sync::Arc;

use rustls::pki_types::{InvalidDnsNameError, ServerName};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::resolve::ResolvedTarget;

/// Error type for upstream dialing. Abandons only the affected pair.
#[derive(Debug, Error)]
pub enum DialError {
    /// TCP connect to the resolved target failed.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The target host is not a valid TLS server name.
    #[error("invalid TLS server name {name:?}: {source}")]
    ServerName {
        name: String,
        source: InvalidDnsNameError,
    },

    /// The TLS handshake with the target failed.
    #[error("TLS handshake with {addr} failed: {source}")]
    Handshake {
        addr: String,
        source: std::io::Error,
    },
}

/// Either half of an upstream connection, plain or TLS.
pub trait UpstreamStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> UpstreamStream for T {}

/// Build the process-wide TLS client configuration (Mozilla roots, no
/// client auth). Only constructed when the resolved target requires TLS.
pub fn client_config() -> Result<Arc<rustls::ClientConfig>, rustls::Error> {
    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder_with_provider(
        rustls::crypto::ring::default_provider().into(),
    )
    .with_safe_default_protocol_versions()?
    .with_root_certificates(root_store)
    .with_no_client_auth();

    Ok(Arc::new(config))
}

/// Dial the resolved target once for a new connection pair.
pub async fn dial_upstream(
    target: &ResolvedTarget,
    tls: Option<&Arc<rustls::ClientConfig>>,
) -> Result<Box<dyn UpstreamStream>, DialError> {
    let addr = target.address();
    let stream = TcpStream::connect(&addr).await.map_err(|source| DialError::Connect {
        addr: addr.clone(),
        source,
    })?;

    let config = match (target.use_tls, tls) {
        (true, Some(config)) => config.clone(),
        _ => return Ok(Box::new(stream)),
    };

    tracing::debug!(target = %addr, "dialing upstream with TLS");

    let server_name =
        ServerName::try_from(target.host.clone()).map_err(|source| DialError::ServerName {
            name: target.host.clone(),
            source,
        })?;

    let tls_stream = TlsConnector::from(config)
        .connect(server_name, stream)
        .await
        .map_err(|source| DialError::Handshake { addr, source })?;

    Ok(Box::new(tls_stream))
}
