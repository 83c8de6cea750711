//! Warehouse services core
//!
//! Entity access over a document store with a read-through cache and a file
//! fallback, change events over a message broker, and JWT authentication with
//! rotating refresh tokens.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod files;
pub mod messaging;
pub mod models;
pub mod service;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{Result, ServiceError};
pub use service::{Services, Stores};
pub use tasks::spawn_cleanup_task;
