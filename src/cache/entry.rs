//! Cache Entry Module
//!
//! Defines a cached snapshot with absolute and sliding expiration.

use chrono::Utc;

// == Cache Entry ==
/// A cached snapshot and its expiry metadata.
///
/// Reading an entry through [`CacheEntry::touch`] resets the sliding window.
/// The absolute expiry is fixed at creation and never extends.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored snapshot
    pub value: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Hard expiry (Unix milliseconds)
    pub absolute_expires_at: i64,
    /// Sliding window length in milliseconds, None = no sliding expiry
    pub sliding_ms: Option<i64>,
    /// Last access (Unix milliseconds)
    pub last_access: i64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `value` - The snapshot to store
    /// * `absolute_ms` - Lifetime from now in milliseconds
    /// * `sliding_ms` - Optional idle window in milliseconds
    pub fn new(value: String, absolute_ms: i64, sliding_ms: Option<i64>) -> Self {
        Self::new_at(value, absolute_ms, sliding_ms, current_timestamp_ms())
    }

    pub(crate) fn new_at(value: String, absolute_ms: i64, sliding_ms: Option<i64>, now: i64) -> Self {
        Self {
            value,
            created_at: now,
            absolute_expires_at: now.saturating_add(absolute_ms),
            sliding_ms,
            last_access: now,
        }
    }

    // == Expiry ==
    /// Effective expiry: the earlier of the absolute expiry and the end of
    /// the current sliding window.
    pub fn expires_at(&self) -> i64 {
        match self.sliding_ms {
            Some(window) => self
                .absolute_expires_at
                .min(self.last_access.saturating_add(window)),
            None => self.absolute_expires_at,
        }
    }

    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its effective expiry.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    pub(crate) fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at()
    }

    /// Records an access, restarting the sliding window.
    pub fn touch(&mut self) {
        self.touch_at(current_timestamp_ms());
    }

    pub(crate) fn touch_at(&mut self, now: i64) {
        self.last_access = now;
    }

    /// Returns remaining lifetime in milliseconds (0 once expired).
    pub fn ttl_remaining_ms(&self) -> i64 {
        (self.expires_at() - current_timestamp_ms()).max(0)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
