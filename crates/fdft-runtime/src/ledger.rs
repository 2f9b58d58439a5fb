#![forbid(unsafe_code)]

//! Bounded FIFO evidence ledger for decision audit trails.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Bounded FIFO buffer of audit records.
///
/// Capacity is enforced via `capacity.max(1)`, so a ledger always keeps at
/// least the latest entry. When full, the oldest entry (front of the
/// `VecDeque`) is evicted before a new entry is appended. `total_recorded`
/// keeps counting across evictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceLedger<T> {
    capacity: usize,
    entries: VecDeque<T>,
    total_recorded: u64,
}

impl<T> EvidenceLedger<T> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
            total_recorded: 0,
        }
    }

    /// Append an entry, evicting the oldest if at capacity.
    pub fn record(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            let _ = self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.total_recorded = self.total_recorded.saturating_add(1);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recently recorded entry.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, evicting the oldest entries that no longer fit.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            let _ = self.entries.pop_front();
        }
    }

    /// Number of entries ever recorded, including evicted ones.
    #[must_use]
    pub const fn total_recorded(&self) -> u64 {
        self.total_recorded
    }

    /// Oldest-first iteration over retained entries.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Remove and return every retained entry, oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        self.entries.drain(..).collect()
    }
}

impl<T: Serialize> EvidenceLedger<T> {
    /// Serialize retained entries as JSON lines, oldest first.
    #[must_use]
    pub fn serialize_jsonl(&self) -> String {
        self.entries
            .iter()
            .filter_map(|e| serde_json::to_string(e).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<T> Default for EvidenceLedger<T> {
    fn default() -> Self {
        Self::new(256)
    }
}
