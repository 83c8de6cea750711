//! Stored records, request inputs and response bodies

pub mod domain;
pub mod entity;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use domain::{
    Customer, CustomerDraft, Log, LogDraft, Manufacturer, ManufacturerDraft, Product,
    ProductDraft, RefreshToken, RefreshTokenDraft, User, UserDraft, DEFAULT_ROLE,
};
pub use entity::{new_id, Entity};
pub use requests::{LoginRequest, ProductInput, RegisterRequest, TokenRequest};
pub use responses::{HealthResponse, StatsResponse, UserAuthenticated, UserResponse};
