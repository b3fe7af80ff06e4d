// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed-capacity FIFO ring buffer with overwrite, used to store each
//! supervised server's stdout/stderr log lines.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::log_entry::LogEntry;

const DEFAULT_CAPACITY: usize = 1000;

/// A thread-safe, fixed-capacity FIFO buffer. When full, `add` evicts
/// the oldest entry. Reads return a consistent snapshot copied out
/// under the lock.
pub struct RingBuffer {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Add an entry, evicting the oldest one if at capacity.
    pub fn add(&self, entry: LogEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Return all entries, oldest first.
    pub fn all(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Return the last `n` entries, oldest first.
    pub fn last(&self, n: usize) -> Vec<LogEntry> {
        let entries = self.entries.lock();
        let len = entries.len();
        let start = len.saturating_sub(n);
        entries.iter().skip(start).cloned().collect()
    }

    /// Return entries at or after `since`, oldest first.
    pub fn since(&self, since: DateTime<Utc>) -> Vec<LogEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Sum of a fixed `50 + len(message)` byte estimate across all entries.
    pub fn estimated_bytes(&self) -> usize {
        self.entries.lock().iter().map(|e| e.estimated_bytes()).sum()
    }
}

#[cfg(test)]
#[path = "ring_buffer_tests.rs"]
mod tests;
