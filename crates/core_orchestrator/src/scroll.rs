use std::ops::Range;

use crate::ChatState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollUpdate {
    /// Index of the entry to bring into view, `None` for an empty transcript.
    pub anchor: Option<usize>,
    pub new_entries: Range<usize>,
    pub pending: bool,
}

/// Snaps the view to the latest entry whenever the transcript length or the
/// pending flag changes.
#[derive(Debug, Default)]
pub struct ScrollTracker {
    seen_len: usize,
    seen_pending: bool,
}

impl ScrollTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, state: &ChatState) -> Option<ScrollUpdate> {
        let len = state.transcript.len();
        let pending = state.pending_send;
        if len == self.seen_len && pending == self.seen_pending {
            return None;
        }
        let start = self.seen_len.min(len);
        self.seen_len = len;
        self.seen_pending = pending;
        Some(ScrollUpdate {
            anchor: len.checked_sub(1),
            new_entries: start..len,
            pending,
        })
    }
}
