//! MongoDB Wire-Protocol Fault-Injection Proxy
//!
//! A transparent TCP intermediary between a MongoDB client and server.
//! Test harnesses embed a `proxyTest` instruction document in an ordinary
//! request; the proxy strips it before forwarding upstream, remembers it
//! per client connection, and replays it as a delay / partial-send / send-
//! all action sequence against the first subsequent reply, then reverts
//! to transparent byte copying.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │               FAULT PROXY                     │
//!  Client request     │  ┌─────────┐   ┌───────────┐   ┌──────────┐  │
//!  ───────────────────┼─▶│  wire   │──▶│instruction│──▶│  wire    │──┼──▶ Server
//!                     │  │ framer  │   │  codec    │   │ splicer  │  │
//!                     │  └─────────┘   └─────┬─────┘   └──────────┘  │
//!                     │                      │ set                    │
//!                     │               ┌──────▼──────┐                 │
//!                     │               │  pending    │                 │
//!                     │               │  registry   │                 │
//!                     │               └──────┬──────┘                 │
//!                     │                      │ take (once)            │
//!  Client reply       │  ┌─────────┐   ┌────▼──────┐                 │
//!  ◀──────────────────┼──│ action  │◀──│  wire     │◀────────────────┼─── Server
//!                     │  │executor │   │  framer   │                 │
//!                     │  └─────────┘   └───────────┘                 │
//!                     └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod config;
pub mod instruction;
pub mod net;
pub mod resolve;
pub mod wire;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use lifecycle::Shutdown;
pub use net::ProxyServer;
