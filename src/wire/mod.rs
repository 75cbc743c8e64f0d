//! Wire-protocol subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming byte stream
//!     → framer.rs (length-prefixed message framing)
//!     → one owned message buffer per call
//!
//! Rewritten request
//!     → splice.rs (replace embedded document, recompute length prefix)
//!     → well-formed message buffer
//! ```
//!
//! # Design Decisions
//! - The framer never over-reads: exactly one message is consumed per call
//! - No opcode interpretation happens here; that belongs to the codec
//! - Splicing is pure byte arithmetic over three unchanged spans

pub mod framer;
pub mod splice;

pub use framer::{read_message, MessageHeader, WireError, HEADER_LEN, OP_MSG};
pub use splice::splice_document;
