//! Multi-tier entity access.
//!
//! Reads go cache, then store, then file fallback. Writes hit the store first
//! and abort if it fails; the cache and file projections and the change event
//! follow and never fail the operation. Each of those secondary failures is
//! logged, counted and handed back in [`Persisted::degraded`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::CacheLayer;
use crate::config::CacheSettings;
use crate::error::{Result, ServiceError};
use crate::files::FileFallbackStore;
use crate::messaging::{EntityEvent, EventPublisher};
use crate::models::{new_id, Entity};
use crate::store::EntityStore;

// == Degraded Writes ==
/// Secondary tier a write can degrade on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Follow-up store call after a change already committed
    Store,
    Cache,
    File,
    Broker,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Store => "store",
            Tier::Cache => "cache",
            Tier::File => "file",
            Tier::Broker => "broker",
        };
        f.write_str(name)
    }
}

/// A secondary write that failed after the store accepted the change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DegradedWrite {
    pub tier: Tier,
    pub reason: String,
}

/// Outcome of a successful write.
#[derive(Debug, Clone, PartialEq)]
pub struct Persisted<T> {
    pub entity: T,
    pub degraded: Vec<DegradedWrite>,
}

impl<T> Persisted<T> {
    pub fn is_degraded(&self) -> bool {
        !self.degraded.is_empty()
    }

    pub fn into_entity(self) -> T {
        self.entity
    }
}

/// Counters of one access service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessStats {
    pub degraded_writes: u64,
}

// == Entity Access Service ==
pub struct EntityAccessService<E: Entity> {
    store: EntityStore<E>,
    cache: CacheLayer,
    cache_settings: CacheSettings,
    files: FileFallbackStore,
    publisher: Option<Arc<dyn EventPublisher>>,
    degraded_writes: Arc<AtomicU64>,
}

impl<E: Entity> Clone for EntityAccessService<E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            cache: self.cache.clone(),
            cache_settings: self.cache_settings,
            files: self.files.clone(),
            publisher: self.publisher.clone(),
            degraded_writes: Arc::clone(&self.degraded_writes),
        }
    }
}

impl<E: Entity> EntityAccessService<E> {
    pub fn new(
        store: EntityStore<E>,
        cache: CacheLayer,
        cache_settings: CacheSettings,
        files: FileFallbackStore,
    ) -> Self {
        Self {
            store,
            cache,
            cache_settings,
            files,
            publisher: None,
            degraded_writes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publishes change events for this kind on the `E::KIND` queue.
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn stats(&self) -> AccessStats {
        AccessStats {
            degraded_writes: self.degraded_writes.load(Ordering::Relaxed),
        }
    }

    fn not_found(id: &str) -> ServiceError {
        ServiceError::not_found("id", format!("{} with id {id} not found", E::NAME))
    }

    // == Reads ==
    /// Every record, straight from the store.
    pub async fn get_all(&self) -> Result<Vec<E>> {
        Ok(self.store.get_all().await?)
    }

    /// Looks `id` up through cache, store and file fallback, in that order.
    ///
    /// A store hit repopulates the cache and the file snapshot. A file hit is
    /// returned as is. When the store failed and the file has nothing either,
    /// the store failure is returned instead of `NotFound`.
    pub async fn get(&self, id: &str) -> Result<E> {
        if let Some(entity) = self.cache.get::<E>(id).await {
            debug!(kind = E::KIND, id, "Cache hit");
            return Ok(entity);
        }

        let store_failure = match self.store.get(id).await {
            Ok(Some(entity)) => {
                debug!(kind = E::KIND, id, "Store hit");
                self.project(&entity).await;
                return Ok(entity);
            }
            Ok(None) => None,
            Err(err) => {
                warn!(kind = E::KIND, id, error = %err, "Store read failed, trying file fallback");
                Some(err)
            }
        };

        match self.files.read::<E>(id).await {
            Ok(Some(entity)) => {
                debug!(kind = E::KIND, id, "File fallback hit");
                return Ok(entity);
            }
            Ok(None) => {}
            Err(err) => warn!(kind = E::KIND, id, error = %err, "File fallback read failed"),
        }

        match store_failure {
            Some(err) => Err(err.into()),
            None => Err(Self::not_found(id)),
        }
    }

    /// Records whose id is in `ids`; unknown ids are skipped.
    pub async fn get_range(&self, ids: &[String]) -> Result<Vec<E>> {
        Ok(self.store.get_range(ids).await?)
    }

    /// Records matching `filter`, straight from the store.
    pub async fn find<F>(&self, filter: F) -> Result<Vec<E>>
    where
        F: Fn(&E) -> bool + Send + Sync,
    {
        Ok(self.store.find(filter).await?)
    }

    // == Writes ==
    pub async fn create(&self, draft: E::Draft) -> Result<Persisted<E>> {
        let entity = E::create(new_id(), draft);
        self.store.create(&entity).await?;

        let mut degraded = self.write_projections(&entity).await;
        self.publish(EntityEvent::created(&entity), &mut degraded).await;
        self.record(entity.id(), &degraded);
        Ok(Persisted { entity, degraded })
    }

    /// Merges `draft` onto the record found by [`get`](Self::get).
    pub async fn update(&self, id: &str, draft: E::Draft) -> Result<Persisted<E>> {
        let mut entity = self.get(id).await?;
        entity.apply(draft);
        self.store.update(&entity).await?;

        let mut degraded = self.write_projections(&entity).await;
        self.publish(EntityEvent::updated(&entity), &mut degraded).await;
        self.record(entity.id(), &degraded);
        Ok(Persisted { entity, degraded })
    }

    /// Deletes `id` if the store has it. Absent records fail with `NotFound`
    /// and touch nothing.
    pub async fn delete(&self, id: &str) -> Result<Persisted<()>> {
        if self.store.get(id).await?.is_none() {
            return Err(Self::not_found(id));
        }
        self.store.delete(id).await?;

        let mut degraded = Vec::new();
        self.cache.remove::<E>(id).await;
        if let Err(err) = self.files.delete::<E>(id).await {
            degraded.push(DegradedWrite {
                tier: Tier::File,
                reason: err.to_string(),
            });
        }
        self.publish(Ok(EntityEvent::deleted::<E>(id)), &mut degraded).await;
        self.record(id, &degraded);
        Ok(Persisted {
            entity: (),
            degraded,
        })
    }

    // == Secondary Tiers ==
    async fn write_projections(&self, entity: &E) -> Vec<DegradedWrite> {
        let mut degraded = Vec::new();
        if let Err(err) = self.cache.set(entity, &self.cache_settings).await {
            degraded.push(DegradedWrite {
                tier: Tier::Cache,
                reason: err.to_string(),
            });
        }
        if let Err(err) = self.files.write(entity).await {
            degraded.push(DegradedWrite {
                tier: Tier::File,
                reason: err.to_string(),
            });
        }
        degraded
    }

    /// Backfills cache and file after a store hit.
    async fn project(&self, entity: &E) {
        let degraded = self.write_projections(entity).await;
        self.record(entity.id(), &degraded);
    }

    async fn publish(
        &self,
        event: serde_json::Result<EntityEvent<Value>>,
        degraded: &mut Vec<DegradedWrite>,
    ) {
        let Some(publisher) = &self.publisher else {
            return;
        };
        let result = match event.and_then(|event| serde_json::to_vec(&event)) {
            Ok(body) => publisher.publish(E::KIND, body).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = result {
            degraded.push(DegradedWrite {
                tier: Tier::Broker,
                reason: err.to_string(),
            });
        }
    }

    /// Logs and counts a degraded write noticed outside this service.
    pub fn report_degraded(&self, id: &str, write: DegradedWrite) {
        self.record(id, std::slice::from_ref(&write));
    }

    fn record(&self, id: &str, degraded: &[DegradedWrite]) {
        for write in degraded {
            self.degraded_writes.fetch_add(1, Ordering::Relaxed);
            warn!(
                kind = E::KIND,
                id,
                tier = %write.tier,
                reason = %write.reason,
                "Degraded write"
            );
        }
    }
}
