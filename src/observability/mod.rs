//! Observability subsystem.
//!
//! Structured logging via `tracing`; every per-connection event carries the
//! pair id, direction, and peer address so a failed exchange can be
//! reconstructed from logs alone.

pub mod logging;
