//! Store Module
//!
//! The document store is the source of truth. A driver implements
//! [`DocumentCollection`] for one collection; [`EntityStore`] wraps it with the
//! shared retry policy.

mod memory;
mod retry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::Entity;

pub use memory::InMemoryCollection;
pub use retry::RetryPolicy;

/// Predicate used for range queries.
pub type Filter<'a, E> = dyn Fn(&E) -> bool + Send + Sync + 'a;

// == Driver Port ==
/// One collection of a document database, keyed by string id.
#[async_trait]
pub trait DocumentCollection<E: Entity>: Send + Sync {
    async fn find_all(&self) -> Result<Vec<E>, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<E>, StoreError>;

    /// Documents whose id is in `ids`. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<E>, StoreError>;

    async fn find_where(&self, filter: &Filter<'_, E>) -> Result<Vec<E>, StoreError>;

    async fn insert(&self, entity: &E) -> Result<(), StoreError>;

    async fn replace(&self, entity: &E) -> Result<(), StoreError>;

    /// Returns whether a document was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

// == Entity Store ==
/// Resilient access to one collection.
pub struct EntityStore<E: Entity> {
    collection: Arc<dyn DocumentCollection<E>>,
    policy: RetryPolicy,
}

impl<E: Entity> Clone for EntityStore<E> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            policy: self.policy,
        }
    }
}

impl<E: Entity> EntityStore<E> {
    pub fn new(collection: Arc<dyn DocumentCollection<E>>, policy: RetryPolicy) -> Self {
        Self { collection, policy }
    }

    /// Store backed by a fresh in-memory collection.
    pub fn in_memory(policy: RetryPolicy) -> Self {
        Self::new(Arc::new(InMemoryCollection::<E>::new()), policy)
    }

    pub async fn get_all(&self) -> Result<Vec<E>, StoreError> {
        self.policy
            .execute(E::KIND, || self.collection.find_all())
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<E>, StoreError> {
        self.policy
            .execute(E::KIND, || self.collection.find_by_id(id))
            .await
    }

    pub async fn get_range(&self, ids: &[String]) -> Result<Vec<E>, StoreError> {
        self.policy
            .execute(E::KIND, || self.collection.find_by_ids(ids))
            .await
    }

    pub async fn find<F>(&self, filter: F) -> Result<Vec<E>, StoreError>
    where
        F: Fn(&E) -> bool + Send + Sync,
    {
        let filter: &Filter<'_, E> = &filter;
        self.policy
            .execute(E::KIND, || self.collection.find_where(filter))
            .await
    }

    pub async fn create(&self, entity: &E) -> Result<(), StoreError> {
        self.policy
            .execute(E::KIND, || self.collection.insert(entity))
            .await
    }

    pub async fn update(&self, entity: &E) -> Result<(), StoreError> {
        self.policy
            .execute(E::KIND, || self.collection.replace(entity))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.policy
            .execute(E::KIND, || self.collection.delete(id))
            .await
    }
}
