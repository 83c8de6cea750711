//! Handlers wired to the entity event queues.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::publisher::{EntityEvent, EventAction};
use super::receiver::MessageHandler;
use crate::error;
use crate::models::LogDraft;
use crate::service::LogService;

/// User name recorded on logs written from broker events.
pub const SYSTEM_USER: &str = "system";

/// Records every entity event as a [`Log`](crate::models::Log).
#[derive(Clone)]
pub struct EventLogHandler {
    logs: LogService,
}

impl EventLogHandler {
    pub fn new(logs: LogService) -> Self {
        Self { logs }
    }
}

fn action_name(kind: &str, action: EventAction) -> String {
    let verb = match action {
        EventAction::Created => "created",
        EventAction::Updated => "updated",
        EventAction::Deleted => "deleted",
    };
    format!("{kind}.{verb}")
}

#[async_trait]
impl MessageHandler<EntityEvent<Value>> for EventLogHandler {
    async fn handle(&self, event: EntityEvent<Value>) -> error::Result<()> {
        let serialized_data = match &event.data {
            Some(data) => data.to_string(),
            None => serde_json::json!({ "id": event.entity_id }).to_string(),
        };
        let draft = LogDraft {
            action: action_name(&event.kind, event.action),
            user_name: SYSTEM_USER.to_string(),
            serialized_data,
        };

        let written = self.logs.access().create(draft).await?;
        debug!(log_id = %written.entity.id, kind = %event.kind, "Recorded entity event");
        Ok(())
    }
}
