//! Error types for the warehouse services
//!
//! Domain outcomes (`NotFound`, `InvalidCredentials`, `TokenExpired`) are plain
//! values callers branch on. Tier-level failures have their own enums and are
//! folded into `ServiceError::Infrastructure` at the service boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Service Error Enum ==
/// Unified error type returned by every service operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Lookup failed across all tiers, or a referenced entity is missing
    #[error("{field}: {message}")]
    NotFound { field: String, message: String },

    /// Password did not match the stored hash
    #[error("{field}: {message}")]
    InvalidCredentials { field: String, message: String },

    /// Refresh token is past its expiry
    #[error("{field}: {message}")]
    TokenExpired { field: String, message: String },

    /// Store, cache, file or broker call failed after retries
    #[error("Infrastructure failure: {0}")]
    Infrastructure(String),
}

impl ServiceError {
    pub fn not_found(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_credentials(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCredentials {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn token_expired(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TokenExpired {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Field the failure refers to, if it is a domain failure.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::NotFound { field, .. }
            | Self::InvalidCredentials { field, .. }
            | Self::TokenExpired { field, .. } => Some(field),
            Self::Infrastructure(_) => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidCredentials { .. } | Self::TokenExpired { .. } => StatusCode::UNAUTHORIZED,
            Self::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == Store Error Enum ==
/// Failure of a document store or file fallback call.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend could not be reached or refused the call
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Snapshot could not be (de)serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error in the fallback tier
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Id cannot be mapped onto the backend's key space
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::Infrastructure(err.to_string())
    }
}

// == Cache Error Enum ==
/// Failure writing to the cache tier.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Key exceeds maximum length of {0} bytes")]
    KeyTooLong(usize),

    #[error("Value exceeds maximum size of {0} bytes")]
    ValueTooLarge(usize),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

// == Broker Error Enum ==
/// Failure talking to the message broker.
#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    #[error("Unknown delivery tag: {0}")]
    UnknownDelivery(u64),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<BrokerError> for ServiceError {
    fn from(err: BrokerError) -> Self {
        ServiceError::Infrastructure(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ServiceError::NotFound { field, message }
            | ServiceError::InvalidCredentials { field, message }
            | ServiceError::TokenExpired { field, message } => json!({
                "field": field,
                "error": message,
            }),
            ServiceError::Infrastructure(_) => json!({
                "error": "Internal server error",
            }),
        };

        (status, Json(body)).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
