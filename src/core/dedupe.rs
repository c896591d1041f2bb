//! Duplicate-scan detection
//!
//! A candidate record duplicates an existing one exactly when the ordered
//! identifier tuple (case, slide, block, container) matches, with empty
//! strings for absent fields. This module keeps a HashMap-based index over
//! the record list so the capture path answers "seen before?" in O(1)
//! instead of rescanning the list on every beep of the scanner.

use std::collections::HashMap;

use crate::core::types::{DedupeKey, Record};

/// O(1) duplicate detection over captured records.
///
/// Keys are identifier tuples; values count how many live records carry
/// that tuple, so deletions keep the index honest when several records
/// share a tuple (possible while dedupe is toggled off).
#[derive(Debug)]
pub struct DedupeIndex {
    /// Maps identifier tuple to the number of records carrying it.
    seen: HashMap<DedupeKey, usize>,
}

impl DedupeIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self {
            seen: HashMap::new(),
        }
    }

    /// Builds an index over an existing record list. Call on startup and
    /// whenever the list is reloaded wholesale.
    pub fn from_records(records: &[Record]) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record.dedupe_key());
        }
        index
    }

    /// True when at least one record already carries this tuple.
    pub fn contains(&self, key: &DedupeKey) -> bool {
        self.seen.get(key).is_some_and(|count| *count > 0)
    }

    /// Registers one more record carrying this tuple.
    pub fn insert(&mut self, key: DedupeKey) {
        *self.seen.entry(key).or_insert(0) += 1;
    }

    /// Unregisters one record carrying this tuple, e.g. after deletion.
    pub fn remove(&mut self, key: &DedupeKey) {
        if let Some(count) = self.seen.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                self.seen.remove(key);
            }
        }
    }

    /// Drops everything, e.g. after a bulk clear.
    pub fn clear(&mut self) {
        self.seen.clear();
    }

    /// Total number of records tracked.
    pub fn total_records(&self) -> usize {
        self.seen.values().sum()
    }
}

impl Default for DedupeIndex {
    fn default() -> Self {
        Self::new()
    }
}
