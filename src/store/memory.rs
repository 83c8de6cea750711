//! In-memory document collection.
//!
//! Stands in for the database driver in development mode and in tests.
//! `fail_next` makes the next N calls fail as if the backend were down.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{DocumentCollection, Filter};
use crate::error::StoreError;
use crate::models::Entity;

#[derive(Debug)]
pub struct InMemoryCollection<E: Entity> {
    documents: RwLock<BTreeMap<String, E>>,
    pending_failures: AtomicUsize,
}

impl<E: Entity> Default for InMemoryCollection<E> {
    fn default() -> Self {
        Self {
            documents: RwLock::new(BTreeMap::new()),
            pending_failures: AtomicUsize::new(0),
        }
    }
}

impl<E: Entity> InMemoryCollection<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` calls fail with `StoreError::Unavailable`.
    pub fn fail_next(&self, count: usize) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        let tripped = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if tripped {
            Err(StoreError::Unavailable(format!("{} collection unreachable", E::KIND)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<E: Entity> DocumentCollection<E> for InMemoryCollection<E> {
    async fn find_all(&self) -> Result<Vec<E>, StoreError> {
        self.check_available()?;
        Ok(self.documents.read().await.values().cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<E>, StoreError> {
        self.check_available()?;
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<E>, StoreError> {
        self.check_available()?;
        let documents = self.documents.read().await;
        Ok(ids.iter().filter_map(|id| documents.get(id).cloned()).collect())
    }

    async fn find_where(&self, filter: &Filter<'_, E>) -> Result<Vec<E>, StoreError> {
        self.check_available()?;
        Ok(self
            .documents
            .read()
            .await
            .values()
            .filter(|doc| filter(doc))
            .cloned()
            .collect())
    }

    async fn insert(&self, entity: &E) -> Result<(), StoreError> {
        self.check_available()?;
        self.documents
            .write()
            .await
            .insert(entity.id().to_string(), entity.clone());
        Ok(())
    }

    async fn replace(&self, entity: &E) -> Result<(), StoreError> {
        self.check_available()?;
        self.documents
            .write()
            .await
            .insert(entity.id().to_string(), entity.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        Ok(self.documents.write().await.remove(id).is_some())
    }
}
