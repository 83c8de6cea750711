//! API Module
//!
//! HTTP surface over the services: one nested router per resource, errors
//! rendered through `ServiceError`'s `IntoResponse`.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::{create_router, entity_routes};
