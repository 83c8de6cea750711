//! Cache Module
//!
//! First read tier: JSON snapshots keyed by `"{kind}:{id}"` with absolute and
//! sliding expiration.

mod entry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::warn;

use crate::config::CacheSettings;
use crate::error::CacheError;
use crate::models::Entity;

// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

/// Builds the cache key for one record.
pub fn cache_key(kind: &str, id: &str) -> String {
    format!("{kind}:{id}")
}

/// Whole milliseconds of `duration`, capped at `i64::MAX`.
fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

// == Cache Layer ==
/// Typed facade over a shared [`CacheStore`].
#[derive(Debug, Clone, Default)]
pub struct CacheLayer {
    store: Arc<RwLock<CacheStore>>,
}

impl CacheLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the underlying engine, for the sweep task.
    pub fn store(&self) -> Arc<RwLock<CacheStore>> {
        Arc::clone(&self.store)
    }

    /// Returns the cached snapshot of `id`, restarting its sliding window.
    ///
    /// A snapshot that no longer deserializes is dropped and reported as a miss.
    pub async fn get<E: Entity>(&self, id: &str) -> Option<E> {
        let key = cache_key(E::KIND, id);
        // Write lock: a read updates the sliding window and stats
        let raw = self.store.write().await.get(&key)?;

        match serde_json::from_str(&raw) {
            Ok(entity) => Some(entity),
            Err(err) => {
                warn!(key = %key, error = %err, "Dropping undecodable cache entry");
                self.store.write().await.remove(&key);
                None
            }
        }
    }

    /// Stores a snapshot of `entity`, replacing any previous one.
    pub async fn set<E: Entity>(&self, entity: &E, settings: &CacheSettings) -> Result<(), CacheError> {
        let key = cache_key(E::KIND, entity.id());
        let value = serde_json::to_string(entity)?;
        let absolute_ms = millis(settings.absolute());
        let sliding_ms = settings.sliding().map(millis);

        self.store
            .write()
            .await
            .set(key, value, absolute_ms, sliding_ms)
    }

    /// Drops the snapshot of `id`, if any.
    pub async fn remove<E: Entity>(&self, id: &str) {
        self.store.write().await.remove(&cache_key(E::KIND, id));
    }

    /// Removes every cached entry.
    pub async fn clear(&self) {
        *self.store.write().await = CacheStore::new();
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Manufacturer, ManufacturerDraft};

    fn manufacturer(id: &str) -> Manufacturer {
        Manufacturer::create(
            id.to_string(),
            ManufacturerDraft {
                name: "Globex".to_string(),
                address: String::new(),
            },
        )
    }

    #[tokio::test]
    async fn test_layer_set_get_remove() {
        let cache = CacheLayer::new();
        let m = manufacturer("m1");

        cache.set(&m, &CacheSettings::default()).await.unwrap();
        assert_eq!(cache.get::<Manufacturer>("m1").await, Some(m));

        cache.remove::<Manufacturer>("m1").await;
        cache.remove::<Manufacturer>("m1").await;
        assert!(cache.get::<Manufacturer>("m1").await.is_none());
    }

    #[tokio::test]
    async fn test_layer_keys_are_scoped_by_kind() {
        let cache = CacheLayer::new();
        cache.set(&manufacturer("x"), &CacheSettings::default()).await.unwrap();

        assert!(cache.get::<crate::models::Customer>("x").await.is_none());
    }

    #[tokio::test]
    async fn test_layer_drops_undecodable_entry() {
        let cache = CacheLayer::new();
        cache
            .store()
            .write()
            .await
            .set(cache_key(Manufacturer::KIND, "bad"), "not json".to_string(), 60_000, None)
            .unwrap();

        assert!(cache.get::<Manufacturer>("bad").await.is_none());
        assert!(cache.store().read().await.is_empty());
    }

    #[tokio::test]
    async fn test_layer_accepts_huge_expiry() {
        let cache = CacheLayer::new();
        let settings = CacheSettings {
            absolute_expiration: u64::MAX,
            sliding_expiration: u64::MAX,
        };
        assert_eq!(millis(settings.absolute()), i64::MAX);

        cache.set(&manufacturer("m1"), &settings).await.unwrap();
        assert_eq!(cache.get::<Manufacturer>("m1").await, Some(manufacturer("m1")));
    }

    #[tokio::test]
    async fn test_layer_clear() {
        let cache = CacheLayer::new();
        cache.set(&manufacturer("m1"), &CacheSettings::default()).await.unwrap();
        cache.clear().await;

        assert!(cache.get::<Manufacturer>("m1").await.is_none());
    }
}
