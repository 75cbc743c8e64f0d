//! Lifecycle management subsystem.
//!
//! Startup is fail-fast: resolve the target, bind the listener, then serve.
//! Shutdown is a broadcast signal the accept loop selects on; live pairs
//! finish on their own as their sockets close.

pub mod shutdown;

pub use shutdown::Shutdown;
