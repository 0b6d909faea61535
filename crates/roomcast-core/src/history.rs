//! Bounded per-room message log.

use std::collections::VecDeque;

use roomcast_proto::ChatMessage;

/// Most recent messages of one room, oldest first.
///
/// Appending past the capacity evicts from the front, so the store always
/// holds the last `capacity` messages in arrival order.
#[derive(Debug, Clone)]
pub struct MessageStore {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl MessageStore {
    /// Create an empty store holding at most `capacity` messages.
    pub fn new(capacity: usize) -> Self {
        Self { messages: VecDeque::with_capacity(capacity.min(1024)), capacity }
    }

    /// Append a message, returning the evicted oldest message if the store
    /// was full.
    ///
    /// A zero-capacity store retains nothing and hands the message back.
    pub fn push(&mut self, message: ChatMessage) -> Option<ChatMessage> {
        if self.capacity == 0 {
            return Some(message);
        }

        let evicted =
            if self.messages.len() >= self.capacity { self.messages.pop_front() } else { None };
        self.messages.push_back(message);
        evicted
    }

    /// Messages oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    /// Owned copy of the retained messages, oldest-first.
    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    /// Number of retained messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(n: usize) -> ChatMessage {
        ChatMessage {
            id: format!("m{n}"),
            content: format!("message {n}"),
            sender_id: "u1".into(),
            sender_name: "User-u1".into(),
            timestamp: "2026-01-01T00:00:00.000Z".into(),
            room_id: "default-room".into(),
        }
    }

    #[test]
    fn push_below_capacity_keeps_everything() {
        let mut store = MessageStore::new(3);
        assert!(store.push(message(1)).is_none());
        assert!(store.push(message(2)).is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn push_past_capacity_evicts_oldest() {
        let mut store = MessageStore::new(100);
        for n in 0..100 {
            assert!(store.push(message(n)).is_none());
        }

        let evicted = store.push(message(100)).unwrap();
        assert_eq!(evicted.id, "m0");
        assert_eq!(store.len(), 100);

        let ids: Vec<_> = store.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"m1"));
        assert_eq!(ids.last(), Some(&"m100"));
    }

    #[test]
    fn zero_capacity_retains_nothing() {
        let mut store = MessageStore::new(0);
        let returned = store.push(message(1)).unwrap();
        assert_eq!(returned.id, "m1");
        assert!(store.is_empty());
    }

    #[test]
    fn to_vec_is_oldest_first() {
        let mut store = MessageStore::new(2);
        store.push(message(1));
        store.push(message(2));
        store.push(message(3));
        let ids: Vec<_> = store.to_vec().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["m2", "m3"]);
    }
}
