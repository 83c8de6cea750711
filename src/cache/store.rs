//! Cache Store Module
//!
//! In-process key-value engine backing the cache tier: a HashMap of snapshots
//! with absolute and sliding expiry.

use std::collections::HashMap;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{CacheEntry, CacheStats, MAX_KEY_LENGTH, MAX_VALUE_SIZE};
use crate::error::CacheError;

// == Cache Store ==
/// Key-value storage with time-based expiry only.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Set ==
    /// Stores a snapshot, unconditionally overwriting any previous entry.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The serialized snapshot
    /// * `absolute_ms` - Lifetime from now in milliseconds
    /// * `sliding_ms` - Optional idle window in milliseconds
    pub fn set(
        &mut self,
        key: String,
        value: String,
        absolute_ms: i64,
        sliding_ms: Option<i64>,
    ) -> Result<(), CacheError> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::KeyTooLong(MAX_KEY_LENGTH));
        }

        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::ValueTooLarge(MAX_VALUE_SIZE));
        }

        let entry = CacheEntry::new(value, absolute_ms, sliding_ms);
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    // == Get ==
    /// Retrieves a snapshot by key and restarts its sliding window.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<String> {
        self.get_at(key, current_timestamp_ms())
    }

    pub(crate) fn get_at(&mut self, key: &str, now: i64) -> Option<String> {
        let expired = match self.entries.get_mut(key) {
            Some(entry) if !entry.is_expired_at(now) => {
                entry.touch_at(now);
                let value = entry.value.clone();
                self.stats.record_hit();
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove(key);
            self.stats.record_expiration();
            self.stats.set_total_entries(self.entries.len());
        }
        self.stats.record_miss();
        None
    }

    // == Remove ==
    /// Removes an entry by key. Removing an absent key is not an error.
    pub fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.stats.set_total_entries(self.entries.len());
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = current_timestamp_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));

        let count = before - self.entries.len();
        for _ in 0..count {
            self.stats.record_expiration();
        }
        self.stats.set_total_entries(self.entries.len());
        count
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
