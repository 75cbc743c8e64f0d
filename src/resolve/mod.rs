//! Target resolution subsystem.
//!
//! # Data Flow
//! ```text
//! TargetConfig (address and/or URI)
//!     → connstring.rs (scheme, hosts, options)
//!     → SRV expansion for mongodb+srv:// seed lists
//!     → ResolvedTarget { host, port, use_tls }
//! ```
//!
//! # Design Decisions
//! - Resolution runs once at startup; failure is fatal
//! - The first URI host / first SRV record is taken as-is; replica-set
//!   primary verification is out of scope here
//! - TLS policy comes from the URI's tls/ssl options (SRV defaults it on)

pub mod connstring;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use thiserror::Error;

use crate::config::TargetConfig;
use connstring::{ConnectionString, Scheme};

/// Default server port when a host lists none.
pub const DEFAULT_TARGET_PORT: u16 = 27017;

/// Error type for target resolution. Fatal at startup.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The connection string could not be parsed.
    #[error("invalid connection string: {0}")]
    ConnString(String),

    /// The SRV lookup itself failed.
    #[error("SRV lookup for {name} failed: {source}")]
    Srv {
        name: String,
        source: hickory_resolver::error::ResolveError,
    },

    /// The SRV lookup succeeded but returned no records.
    #[error("no SRV records found for {0}")]
    NoSrvRecords(String),

    /// A host entry was not a usable host:port.
    #[error("invalid target host {0:?}")]
    InvalidHost(String),
}

/// A concrete dial target plus TLS policy, produced once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
}

impl ResolvedTarget {
    /// The `host:port` string to dial.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Resolve the configured target into one concrete address and a TLS
/// decision. The URI takes precedence over the bare address when both are
/// set.
pub async fn resolve_target(config: &TargetConfig) -> Result<ResolvedTarget, ResolveError> {
    match &config.uri {
        Some(uri) => resolve_uri(uri).await,
        None => {
            let (host, port) = split_host_port(&config.address)?;
            Ok(ResolvedTarget {
                host,
                port,
                use_tls: false,
            })
        }
    }
}

async fn resolve_uri(uri: &str) -> Result<ResolvedTarget, ResolveError> {
    let cs = ConnectionString::parse(uri).map_err(ResolveError::ConnString)?;
    let use_tls = cs.use_tls();

    match cs.scheme {
        Scheme::Mongodb => {
            // first listed host; writable-primary probing is out of scope
            let first = cs
                .hosts
                .first()
                .ok_or_else(|| ResolveError::ConnString("no hosts in URI".into()))?;
            let (host, port) = split_host_port(first)?;
            Ok(ResolvedTarget {
                host,
                port,
                use_tls,
            })
        }
        Scheme::MongodbSrv => {
            let seed = cs
                .hosts
                .first()
                .ok_or_else(|| ResolveError::ConnString("no seed host in SRV URI".into()))?;
            let (host, port) = lookup_srv(seed).await?;
            Ok(ResolvedTarget {
                host,
                port,
                use_tls,
            })
        }
    }
}

/// Build a resolver from the system DNS configuration, so SRV records in
/// private zones are found the same way the host's own tooling finds them.
/// Falls back to the library defaults when the system config is unreadable.
fn system_resolver() -> TokioAsyncResolver {
    match TokioAsyncResolver::tokio_from_system_conf() {
        Ok(resolver) => resolver,
        Err(e) => {
            tracing::warn!(error = %e, "system DNS configuration unreadable, using default resolver");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        }
    }
}

/// Expand a DNS seed-list host to the first `_mongodb._tcp` SRV record.
async fn lookup_srv(seed: &str) -> Result<(String, u16), ResolveError> {
    let resolver = system_resolver();
    let name = format!("_mongodb._tcp.{seed}");

    let lookup = resolver
        .srv_lookup(name.clone())
        .await
        .map_err(|source| ResolveError::Srv { name, source })?;

    let record = lookup
        .iter()
        .next()
        .ok_or_else(|| ResolveError::NoSrvRecords(seed.to_string()))?;

    let host = record.target().to_utf8();
    let host = host.trim_end_matches('.').to_string();
    Ok((host, record.port()))
}

fn split_host_port(entry: &str) -> Result<(String, u16), ResolveError> {
    match entry.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => {
            let port: u16 = port
                .parse()
                .map_err(|_| ResolveError::InvalidHost(entry.to_string()))?;
            Ok((host.to_string(), port))
        }
        None if !entry.is_empty() => Ok((entry.to_string(), DEFAULT_TARGET_PORT)),
        _ => Err(ResolveError::InvalidHost(entry.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bare_address_resolves_without_tls() {
        let config = TargetConfig {
            address: "127.0.0.1:27018".into(),
            uri: None,
        };
        let target = resolve_target(&config).await.unwrap();
        assert_eq!(target.address(), "127.0.0.1:27018");
        assert!(!target.use_tls);
    }

    #[tokio::test]
    async fn uri_takes_precedence_and_derives_tls() {
        let config = TargetConfig {
            address: "127.0.0.1:1".into(),
            uri: Some("mongodb://db1.example.com:27020,db2.example.com:27021/?tls=true".into()),
        };
        let target = resolve_target(&config).await.unwrap();
        assert_eq!(target.address(), "db1.example.com:27020");
        assert!(target.use_tls);
    }

    #[tokio::test]
    async fn portless_host_gets_default_port() {
        let config = TargetConfig {
            address: "127.0.0.1:1".into(),
            uri: Some("mongodb://db.example.com".into()),
        };
        let target = resolve_target(&config).await.unwrap();
        assert_eq!(target.port, DEFAULT_TARGET_PORT);
        assert!(!target.use_tls);
    }

    #[tokio::test]
    async fn resolver_construction_never_fails() {
        // whether or not the host has a readable DNS configuration, SRV
        // expansion must always get a usable resolver
        let _resolver = system_resolver();
    }

    #[tokio::test]
    async fn garbage_uri_is_fatal() {
        let config = TargetConfig {
            address: "127.0.0.1:1".into(),
            uri: Some("postgres://nope".into()),
        };
        assert!(resolve_target(&config).await.is_err());
    }
}
