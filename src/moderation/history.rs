//! Recent chat history
//!
//! Bounded FIFO of the last messages in a channel, given to the oracle as
//! short-term context.

use crate::moderation::ChatMessage;
use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

/// Default number of messages kept per channel
pub const DEFAULT_HISTORY_SIZE: usize = 20;

/// Ring of the most recent messages; the lock lets inspectors read while the
/// monitor writes
#[derive(Debug)]
pub struct HistoryBuffer {
    capacity: usize,
    messages: RwLock<VecDeque<ChatMessage>>,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

impl HistoryBuffer {
    /// Create a buffer holding at most `capacity` messages
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            messages: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append a message, evicting the oldest once full
    pub fn add(&self, message: ChatMessage) {
        if self.capacity == 0 {
            return;
        }
        let mut messages = self.messages.write().unwrap_or_else(PoisonError::into_inner);
        while messages.len() >= self.capacity {
            messages.pop_front();
        }
        messages.push_back(message);
    }

    /// Independent copy of the buffer, oldest first
    #[must_use]
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::ChannelRef;

    fn message(n: usize) -> ChatMessage {
        ChatMessage::new(
            ChannelRef::new("100", "general"),
            format!("m{n}"),
            "someone",
            format!("message {n}"),
        )
    }

    #[test]
    fn test_keeps_last_items_in_order() {
        let buffer = HistoryBuffer::new(3);
        for n in 0..7 {
            buffer.add(message(n));
        }

        assert_eq!(buffer.len(), 3);
        let ids: Vec<String> = buffer.snapshot().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m4", "m5", "m6"]);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let buffer = HistoryBuffer::new(5);
        buffer.add(message(1));
        buffer.add(message(2));

        let mut snapshot = buffer.snapshot();
        snapshot.clear();
        snapshot.push(message(99));

        let again = buffer.snapshot();
        assert_eq!(again.len(), 2);
        assert_eq!(again[0].id, "m1");
        assert_eq!(again[1].id, "m2");
    }

    #[test]
    fn test_default_capacity() {
        let buffer = HistoryBuffer::default();
        assert_eq!(buffer.capacity(), DEFAULT_HISTORY_SIZE);
        assert!(buffer.is_empty());
        for n in 0..25 {
            buffer.add(message(n));
        }
        assert_eq!(buffer.len(), DEFAULT_HISTORY_SIZE);
        assert_eq!(buffer.snapshot()[0].id, "m5");
    }
}
