//! Bounded feed of the most recent status messages.

use std::collections::VecDeque;

use crate::config::DEFAULT_FEED_CAPACITY;
use crate::model::StatusMessage;

/// Append-only ring keeping the newest `capacity` messages in completion
/// order.
#[derive(Debug, Clone)]
pub struct StatusFeed {
    entries: VecDeque<StatusMessage>,
    capacity: usize,
}

impl StatusFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, message: StatusMessage) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(message);
    }

    pub fn iter(&self) -> impl Iterator<Item = &StatusMessage> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&StatusMessage> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for StatusFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}
