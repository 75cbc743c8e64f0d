//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

/// Root configuration for the fault-injection proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, connection bound).
    pub listener: ListenerConfig,

    /// Upstream target configuration.
    pub target: TargetConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:28017").
    pub bind_address: String,

    /// Maximum concurrent connection pairs (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:28017".to_string(),
            max_connections: 1024,
        }
    }
}

/// Upstream target configuration.
///
/// `uri` takes precedence over `address` when both are set.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Bare upstream address (e.g., "127.0.0.1:27017").
    pub address: String,

    /// Full connection URI (`mongodb://` or `mongodb+srv://`).
    pub uri: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:27017".to_string(),
            uri: None,
        }
    }
}
