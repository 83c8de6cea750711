//! Response DTOs
//!
//! External representations returned by the services and the HTTP surface.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::User;

/// A user as exposed to callers; the password hash never leaves the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub user_name: String,
    pub full_name: String,
    pub registration_date: DateTime<Utc>,
    pub email: String,
    pub phone: String,
    pub roles: Vec<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            user_name: user.user_name.clone(),
            full_name: user.full_name.clone(),
            registration_date: user.registration_date,
            email: user.email.clone(),
            phone: user.phone.clone(),
            roles: user.roles.clone(),
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

/// Result of a successful login or refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAuthenticated {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for GET /stats
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_expirations: u64,
    pub cache_entries: usize,
    pub cache_hit_rate: f64,
    /// Cache, file or broker writes that failed after the store write
    pub degraded_writes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_response_omits_hash() {
        let user = User {
            id: "u1".to_string(),
            user_name: "jane".to_string(),
            full_name: "Jane Doe".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            registration_date: Utc::now(),
            email: "jane@example.test".to_string(),
            phone: String::new(),
            roles: vec!["User".to_string()],
        };

        let json = serde_json::to_string(&UserResponse::from(&user)).unwrap();
        assert!(json.contains("jane"));
        assert!(!json.contains("argon2"));
        assert!(!json.contains("passwordHash"));
    }

    #[test]
    fn test_health_response_serialize() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }
}
