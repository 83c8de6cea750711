//! The `Entity` trait every stored record kind implements.

use std::fmt::Debug;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// A record kind managed by [`EntityAccessService`](crate::service::EntityAccessService).
///
/// `KIND` names the collection, the cache key prefix, the fallback directory
/// and the event queue for the kind.
pub trait Entity: Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Storage name shared by every tier, e.g. `"customers"`
    const KIND: &'static str;
    /// Human-readable singular name used in error messages
    const NAME: &'static str;

    /// Input a record is built from and merged with on update.
    type Draft: Send + 'static;

    fn id(&self) -> &str;

    /// Builds a new record under a freshly assigned id.
    fn create(id: String, draft: Self::Draft) -> Self;

    /// Merges an update onto an existing record. The id never changes.
    fn apply(&mut self, draft: Self::Draft);

    /// Snapshot carried by change events. Kinds holding secrets override
    /// this to leave them out.
    fn event_payload(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Generates a new record id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
