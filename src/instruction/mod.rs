//! Fault-injection instruction subsystem.
//!
//! # Data Flow
//! ```text
//! Client request (OP_MSG)
//!     → codec.rs (locate + strip the proxyTest field, parse actions)
//!     → registry.rs (pending instruction, keyed by connection)
//!
//! First matching reply
//!     → registry.rs (atomic take)
//!     → executor.rs (ordered delay / partial-send / send-all)
//! ```
//!
//! # Design Decisions
//! - Shape mismatches are pass-through, never errors; most traffic is
//!   legitimately ordinary protocol messages
//! - A malformed instruction payload is a hard error: the connection dies
//!   rather than forwarding a half-understood test directive
//! - One pending instruction per connection, last write wins

pub mod codec;
pub mod executor;
pub mod registry;

pub use codec::{intercept_request, Action, FaultInstruction, InstructionError, Intercept};
pub use registry::{ConnectionId, PendingInstructions};
