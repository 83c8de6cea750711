//! Shared fixtures for service-level tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use super::{Services, Stores};
use crate::config::{Config, RetrySettings};
use crate::error::BrokerError;
use crate::messaging::{BrokerPublisher, EventPublisher, InMemoryBroker, InMemoryConnection};
use crate::models::Customer;
use crate::store::{EntityStore, InMemoryCollection, RetryPolicy};

pub(crate) struct TestContext {
    pub services: Services,
    pub stores: Stores,
    pub customer_collection: Arc<InMemoryCollection<Customer>>,
    pub broker: InMemoryBroker,
    pub config: Config,
    pub dir: TempDir,
    _publisher_connection: InMemoryConnection,
}

pub(crate) fn test_config(dir: &TempDir) -> Config {
    Config {
        data_dir: dir.path().to_path_buf(),
        retry: RetrySettings {
            retry_count: 2,
            retry_delay_ms: 1,
            exponential: false,
        },
        ..Config::default()
    }
}

/// Services over fresh in-memory stores, a temp file root and an in-memory
/// broker. Store retries are short.
pub(crate) async fn context() -> TestContext {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let policy = RetryPolicy::from(config.retry);

    let customer_collection = Arc::new(InMemoryCollection::<Customer>::new());
    let stores = Stores {
        customers: EntityStore::new(customer_collection.clone(), policy),
        ..Stores::in_memory(policy)
    };

    let broker = InMemoryBroker::new();
    let connection = broker.connect();
    let publisher: Arc<dyn EventPublisher> = Arc::new(BrokerPublisher::open(&connection).await.unwrap());
    let services = Services::new(&config, stores.clone(), Some(publisher));

    TestContext {
        services,
        stores,
        customer_collection,
        broker,
        config,
        dir,
        _publisher_connection: connection,
    }
}

/// Publisher whose broker is always down.
pub(crate) struct DownPublisher;

#[async_trait]
impl EventPublisher for DownPublisher {
    async fn publish(&self, _queue: &str, _body: Vec<u8>) -> Result<(), BrokerError> {
        Err(BrokerError::ChannelClosed("broker unreachable".to_string()))
    }
}

/// Short retry policy used by ad-hoc stores in tests.
pub(crate) fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_millis(1), false)
}
