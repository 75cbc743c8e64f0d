//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CLI flag overrides (main.rs)
//!     → ProxyConfig (immutable for the process lifetime)
//! ```
//!
//! # Design Decisions
//! - All fields have defaults so a flagless invocation just works
//! - Validation separates syntactic (serde) from semantic checks
//! - The target URI, when set, takes precedence over the bare address

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{ListenerConfig, ProxyConfig, TargetConfig};
