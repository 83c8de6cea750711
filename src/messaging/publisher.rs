//! Entity change events and their publisher.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::broker::{BrokerChannel, BrokerConnection};
use crate::error::BrokerError;
use crate::models::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventAction {
    Created,
    Updated,
    Deleted,
}

/// Message body published on the `{kind}` queue after every write.
///
/// `data` carries the record's event payload; it is absent for deletions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityEvent<T> {
    pub kind: String,
    pub action: EventAction,
    pub entity_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub occurred_at: DateTime<Utc>,
}

impl EntityEvent<Value> {
    pub fn created<E: Entity>(entity: &E) -> serde_json::Result<Self> {
        Self::with_payload(EventAction::Created, entity)
    }

    pub fn updated<E: Entity>(entity: &E) -> serde_json::Result<Self> {
        Self::with_payload(EventAction::Updated, entity)
    }

    pub fn deleted<E: Entity>(id: &str) -> Self {
        Self {
            kind: E::KIND.to_string(),
            action: EventAction::Deleted,
            entity_id: id.to_string(),
            data: None,
            occurred_at: Utc::now(),
        }
    }

    /// Built from [`Entity::event_payload`], never from the raw record.
    fn with_payload<E: Entity>(action: EventAction, entity: &E) -> serde_json::Result<Self> {
        Ok(Self {
            kind: E::KIND.to_string(),
            action,
            entity_id: entity.id().to_string(),
            data: Some(entity.event_payload()?),
            occurred_at: Utc::now(),
        })
    }
}

/// Fire-and-forget notification of entity changes.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), BrokerError>;
}

/// Publishes over a dedicated broker channel.
pub struct BrokerPublisher {
    channel: Arc<dyn BrokerChannel>,
}

impl BrokerPublisher {
    pub async fn open(connection: &dyn BrokerConnection) -> Result<Self, BrokerError> {
        Ok(Self {
            channel: connection.open_channel().await?,
        })
    }
}

#[async_trait]
impl EventPublisher for BrokerPublisher {
    async fn publish(&self, queue: &str, body: Vec<u8>) -> Result<(), BrokerError> {
        self.channel.declare_queue(queue).await?;
        self.channel.publish(queue, body).await?;
        debug!(queue, "Published event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryBroker;
    use crate::models::{Customer, CustomerDraft};

    fn customer() -> Customer {
        Customer::create(
            "c1".to_string(),
            CustomerDraft {
                name: "Acme".to_string(),
                address: String::new(),
                phone: String::new(),
                email: String::new(),
            },
        )
    }

    #[test]
    fn test_deleted_event_has_no_data() {
        let event = EntityEvent::deleted::<Customer>("c1");
        let json = serde_json::to_string(&event).unwrap();

        assert!(json.contains(r#""action":"deleted""#));
        assert!(!json.contains("data"));
    }

    #[tokio::test]
    async fn test_broker_publisher_declares_queue() {
        let broker = InMemoryBroker::new();
        let publisher = BrokerPublisher::open(&broker.connect()).await.unwrap();
        let body = serde_json::to_vec(&EntityEvent::created(&customer()).unwrap()).unwrap();

        publisher.publish(Customer::KIND, body).await.unwrap();

        let queued = broker.peek(Customer::KIND);
        assert_eq!(queued.len(), 1);
        let event: EntityEvent<Customer> = serde_json::from_slice(&queued[0]).unwrap();
        assert_eq!(event.action, EventAction::Created);
        assert_eq!(event.data, Some(customer()));
    }
}
