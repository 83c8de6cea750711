//! Request DTOs
//!
//! Inputs accepted by the product and auth flows.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Product input as received: references are ids, resolved before persisting.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    #[serde(default = "Utc::now")]
    pub date_of_receipt: DateTime<Utc>,
    pub customer_id: String,
    #[serde(default)]
    pub manufacturer_ids: Vec<String>,
}

/// Request body for registration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_name: String,
    pub password: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
}

/// Request body for login
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

/// Request body carrying a refresh token value
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_input_deserialize() {
        let json = r#"{"name":"Widget","customerId":"c1","manufacturerIds":["m1"]}"#;
        let input: ProductInput = serde_json::from_str(json).unwrap();

        assert_eq!(input.name, "Widget");
        assert_eq!(input.customer_id, "c1");
        assert_eq!(input.manufacturer_ids, vec!["m1".to_string()]);
    }

    #[test]
    fn test_register_request_optional_fields() {
        let json = r#"{"userName":"jane","password":"secret"}"#;
        let req: RegisterRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.user_name, "jane");
        assert!(req.email.is_empty());
    }
}
