//! Messaging Module
//!
//! Entity change events, the broker ports they travel over, and the queue
//! receivers that consume them.

pub mod broker;
pub mod handlers;
pub mod publisher;
pub mod receiver;

pub use broker::{BrokerChannel, BrokerConnection, Delivery, InMemoryBroker, InMemoryConnection};
pub use handlers::EventLogHandler;
pub use publisher::{BrokerPublisher, EntityEvent, EventAction, EventPublisher};
pub use receiver::{
    dead_letter_queue, spawn_receiver, MessageHandler, MessageReceiver, ReceiverStats,
    RedeliveryPolicy,
};
