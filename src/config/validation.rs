//! Semantic configuration checks.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a valid socket address")]
    BindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    MaxConnections,

    #[error("target.address must not be empty")]
    EmptyTarget,

    #[error("target.uri {0:?} must start with mongodb:// or mongodb+srv://")]
    UriScheme(String),
}

/// Validate a configuration, collecting every problem rather than stopping
/// at the first.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::MaxConnections);
    }
    if config.target.address.is_empty() && config.target.uri.is_none() {
        errors.push(ValidationError::EmptyTarget);
    }
    if let Some(uri) = &config.target.uri {
        if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
            errors.push(ValidationError::UriScheme(uri.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
