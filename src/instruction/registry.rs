//! Pending-instruction registry.
//!
//! # Responsibilities
//! - Correlate a stripped request with the first subsequent reply on the
//!   same client connection
//! - Offer atomic take-once lookup across arbitrarily many connection pairs
//!
//! # Design Decisions
//! - Keyed by connection identity, not request id: the protocol guarantees
//!   no usable correlation id, and one in-flight instruction per connection
//!   is an accepted limitation
//! - Last write wins when a second instruction arrives before the first is
//!   consumed; this is not a queue

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::instruction::codec::FaultInstruction;

/// Identity of one accepted client connection, shared by both directional
/// loops of its pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate the next process-unique connection id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Concurrency-safe store of at most one pending instruction per
/// connection. One shared instance spans the process lifetime.
#[derive(Debug, Default)]
pub struct PendingInstructions {
    entries: DashMap<ConnectionId, FaultInstruction>,
}

impl PendingInstructions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the pending instruction for a connection.
    pub fn set(&self, id: ConnectionId, instruction: FaultInstruction) {
        self.entries.insert(id, instruction);
    }

    /// Atomically read and remove the pending instruction, if any.
    ///
    /// No two callers can observe the same entry.
    pub fn take(&self, id: ConnectionId) -> Option<FaultInstruction> {
        self.entries.remove(&id).map(|(_, instruction)| instruction)
    }

    /// Drop any leftover entry at pair teardown so the map stays bounded
    /// by the number of live connections.
    pub fn discard(&self, id: ConnectionId) {
        self.entries.remove(&id);
    }

    /// Number of instructions currently awaiting a reply.
    pub fn pending(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::codec::Action;

    fn instruction(ms: u64) -> FaultInstruction {
        FaultInstruction {
            actions: vec![Action::Delay(ms), Action::SendAll],
        }
    }

    #[test]
    fn take_consumes_exactly_once() {
        let registry = PendingInstructions::new();
        let id = ConnectionId::next();

        registry.set(id, instruction(10));
        assert_eq!(registry.take(id), Some(instruction(10)));
        assert_eq!(registry.take(id), None);
    }

    #[test]
    fn last_write_wins() {
        let registry = PendingInstructions::new();
        let id = ConnectionId::next();

        registry.set(id, instruction(10));
        registry.set(id, instruction(99));
        assert_eq!(registry.take(id), Some(instruction(99)));
        assert_eq!(registry.pending(), 0);
    }

    #[test]
    fn connections_are_isolated() {
        let registry = PendingInstructions::new();
        let a = ConnectionId::next();
        let b = ConnectionId::next();

        registry.set(a, instruction(1));
        assert_eq!(registry.take(b), None);
        assert_eq!(registry.take(a), Some(instruction(1)));
    }

    #[test]
    fn discard_clears_leftovers() {
        let registry = PendingInstructions::new();
        let id = ConnectionId::next();

        registry.set(id, instruction(1));
        registry.discard(id);
        assert_eq!(registry.take(id), None);
    }
}
