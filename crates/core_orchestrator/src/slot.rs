use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Orders responses for one logical request slot: a result is applied only if
/// nothing newer has been applied already.
#[derive(Debug, Default)]
pub struct RequestSlot {
    issued: AtomicU64,
    applied: Mutex<u64>,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Marks `ticket` as applied; false when a newer ticket already was.
    pub fn settle(&self, ticket: Ticket) -> bool {
        let mut applied = self.applied.lock();
        if ticket.0 > *applied {
            *applied = ticket.0;
            true
        } else {
            false
        }
    }

    pub fn is_stale(&self, ticket: Ticket) -> bool {
        ticket.0 <= *self.applied.lock()
    }
}
