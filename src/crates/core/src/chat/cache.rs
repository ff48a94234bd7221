//! Per-reply equation cache.
//!
//! Maps the reply id of an assistant turn to the equation text its streaming
//! pass computed. Exactly one pass writes a given key; conversation builds
//! read it later to splice the equation back into that turn's content.

use dashmap::DashMap;

use crate::chat::message::ReplyId;

pub struct EquationCache {
    entries: DashMap<ReplyId, String>,
    capacity: usize,
}

impl EquationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Insert or overwrite the equation for a reply. When the cache is over
    /// capacity the oldest reply id is evicted — reply ids are timestamps,
    /// so ordering by key is insertion order.
    pub fn put(&self, reply_id: ReplyId, equation: String) {
        self.entries.insert(reply_id, equation);
        while self.entries.len() > self.capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .map(|entry| entry.key().clone())
                .min()
            else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    pub fn get(&self, reply_id: &ReplyId) -> Option<String> {
        self.entries.get(reply_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
