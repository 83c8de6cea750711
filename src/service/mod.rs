//! Service Module
//!
//! One [`EntityAccessService`] per record kind, plus the kind-specific
//! services layered on top of them.

mod access;
mod log;
mod product;
mod user;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use crate::cache::CacheLayer;
use crate::config::Config;
use crate::files::FileFallbackStore;
use crate::messaging::EventPublisher;
use crate::models::{Customer, Entity, Log, Manufacturer, Product, RefreshToken, User};
use crate::store::{EntityStore, RetryPolicy};

pub use access::{AccessStats, DegradedWrite, EntityAccessService, Persisted, Tier};
pub use log::LogService;
pub use product::ProductService;
pub use user::UserService;

/// Store handles for every record kind.
#[derive(Clone)]
pub struct Stores {
    pub customers: EntityStore<Customer>,
    pub manufacturers: EntityStore<Manufacturer>,
    pub products: EntityStore<Product>,
    pub logs: EntityStore<Log>,
    pub users: EntityStore<User>,
    pub refresh_tokens: EntityStore<RefreshToken>,
}

impl Stores {
    /// Fresh in-memory collections sharing one retry policy.
    pub fn in_memory(policy: RetryPolicy) -> Self {
        Self {
            customers: EntityStore::in_memory(policy),
            manufacturers: EntityStore::in_memory(policy),
            products: EntityStore::in_memory(policy),
            logs: EntityStore::in_memory(policy),
            users: EntityStore::in_memory(policy),
            refresh_tokens: EntityStore::in_memory(policy),
        }
    }
}

/// Every service of the application, sharing one cache and one file root.
#[derive(Clone)]
pub struct Services {
    pub customers: EntityAccessService<Customer>,
    pub manufacturers: EntityAccessService<Manufacturer>,
    pub products: ProductService,
    pub logs: LogService,
    pub users: UserService,
    pub refresh_tokens: EntityAccessService<RefreshToken>,
    pub cache: CacheLayer,
}

impl Services {
    /// Wires the services over `stores`.
    ///
    /// Customer, manufacturer, product and user changes are published when a
    /// publisher is given. Logs and refresh tokens never are.
    pub fn new(config: &Config, stores: Stores, publisher: Option<Arc<dyn EventPublisher>>) -> Self {
        let cache = CacheLayer::new();
        let files = FileFallbackStore::new(&config.data_dir);
        let settings = &config.cache;

        let customers = publishing(
            &publisher,
            EntityAccessService::new(stores.customers, cache.clone(), settings.customer, files.clone()),
        );
        let manufacturers = publishing(
            &publisher,
            EntityAccessService::new(
                stores.manufacturers,
                cache.clone(),
                settings.manufacturer,
                files.clone(),
            ),
        );
        let products = publishing(
            &publisher,
            EntityAccessService::new(stores.products, cache.clone(), settings.product, files.clone()),
        );
        let users = publishing(
            &publisher,
            EntityAccessService::new(stores.users, cache.clone(), settings.user, files.clone()),
        );
        let logs = EntityAccessService::new(stores.logs, cache.clone(), settings.log, files.clone());
        let refresh_tokens = EntityAccessService::new(
            stores.refresh_tokens,
            cache.clone(),
            settings.refresh_token,
            files,
        );

        Self {
            products: ProductService::new(products, customers.clone(), manufacturers.clone()),
            customers,
            manufacturers,
            logs: LogService::new(logs),
            users: UserService::new(users),
            refresh_tokens,
            cache,
        }
    }
}

fn publishing<E: Entity>(
    publisher: &Option<Arc<dyn EventPublisher>>,
    service: EntityAccessService<E>,
) -> EntityAccessService<E> {
    match publisher {
        Some(publisher) => service.with_publisher(Arc::clone(publisher)),
        None => service,
    }
}
