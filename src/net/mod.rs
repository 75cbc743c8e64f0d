//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → tls.rs (dial upstream, plain or TLS per resolved target)
//!     → connection.rs (connection pair, two directional loops)
//!
//! Per pair:
//!     client → upstream: frame → strip instruction → splice → forward
//!     upstream → client: frame → registry take → actions → raw copy
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - A dial failure abandons only that pair; the listener never stops
//! - Each underlying connection is read by exactly one loop and written
//!   by exactly one loop, so the pair needs no locking of its own

pub mod connection;
pub mod listener;
pub mod server;
pub mod tls;

pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use server::ProxyServer;
