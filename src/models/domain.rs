//! Stored record kinds and the drafts they are built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::responses::UserResponse;

/// Role given to every self-registered user.
pub const DEFAULT_ROLE: &str = "User";

// == Customer ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDraft {
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
}

impl Entity for Customer {
    const KIND: &'static str = "customers";
    const NAME: &'static str = "Customer";
    type Draft = CustomerDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn create(id: String, draft: CustomerDraft) -> Self {
        Self {
            id,
            name: draft.name,
            address: draft.address,
            phone: draft.phone,
            email: draft.email,
        }
    }

    fn apply(&mut self, draft: CustomerDraft) {
        self.name = draft.name;
        self.address = draft.address;
        self.phone = draft.phone;
        self.email = draft.email;
    }
}

// == Manufacturer ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manufacturer {
    pub id: String,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManufacturerDraft {
    pub name: String,
    #[serde(default)]
    pub address: String,
}

impl Entity for Manufacturer {
    const KIND: &'static str = "manufacturers";
    const NAME: &'static str = "Manufacturer";
    type Draft = ManufacturerDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn create(id: String, draft: ManufacturerDraft) -> Self {
        Self {
            id,
            name: draft.name,
            address: draft.address,
        }
    }

    fn apply(&mut self, draft: ManufacturerDraft) {
        self.name = draft.name;
        self.address = draft.address;
    }
}

// == Product ==
/// A product with copies of the customer and manufacturers it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub date_of_receipt: DateTime<Utc>,
    pub customer: Customer,
    pub manufacturers: Vec<Manufacturer>,
}

/// Product input after its references have been resolved.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub date_of_receipt: DateTime<Utc>,
    pub customer: Customer,
    pub manufacturers: Vec<Manufacturer>,
}

impl Entity for Product {
    const KIND: &'static str = "products";
    const NAME: &'static str = "Product";
    type Draft = ProductDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn create(id: String, draft: ProductDraft) -> Self {
        Self {
            id,
            name: draft.name,
            date_of_receipt: draft.date_of_receipt,
            customer: draft.customer,
            manufacturers: draft.manufacturers,
        }
    }

    fn apply(&mut self, draft: ProductDraft) {
        self.name = draft.name;
        self.date_of_receipt = draft.date_of_receipt;
        self.customer = draft.customer;
        self.manufacturers = draft.manufacturers;
    }
}

// == Log ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub id: String,
    pub action: String,
    pub user_name: String,
    pub serialized_data: String,
    pub action_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDraft {
    pub action: String,
    pub user_name: String,
    #[serde(default)]
    pub serialized_data: String,
}

impl Entity for Log {
    const KIND: &'static str = "logs";
    const NAME: &'static str = "Log";
    type Draft = LogDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn create(id: String, draft: LogDraft) -> Self {
        Self {
            id,
            action: draft.action,
            user_name: draft.user_name,
            serialized_data: draft.serialized_data,
            action_date: Utc::now(),
        }
    }

    fn apply(&mut self, draft: LogDraft) {
        self.action = draft.action;
        self.user_name = draft.user_name;
        self.serialized_data = draft.serialized_data;
    }
}

// == User ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub user_name: String,
    pub full_name: String,
    pub password_hash: String,
    pub registration_date: DateTime<Utc>,
    pub email: String,
    pub phone: String,
    pub roles: Vec<String>,
}

/// Profile fields of a user. Credentials and roles are only set by the
/// auth flows, never from request bodies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDraft {
    pub user_name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(skip)]
    pub password_hash: Option<String>,
    #[serde(skip)]
    pub roles: Option<Vec<String>>,
}

impl Entity for User {
    const KIND: &'static str = "users";
    const NAME: &'static str = "User";
    type Draft = UserDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn create(id: String, draft: UserDraft) -> Self {
        Self {
            id,
            user_name: draft.user_name,
            full_name: draft.full_name,
            password_hash: draft.password_hash.unwrap_or_default(),
            registration_date: Utc::now(),
            email: draft.email,
            phone: draft.phone,
            roles: draft
                .roles
                .unwrap_or_else(|| vec![DEFAULT_ROLE.to_string()]),
        }
    }

    fn apply(&mut self, draft: UserDraft) {
        self.user_name = draft.user_name;
        self.full_name = draft.full_name;
        self.email = draft.email;
        self.phone = draft.phone;
        if let Some(hash) = draft.password_hash {
            self.password_hash = hash;
        }
        if let Some(roles) = draft.roles {
            self.roles = roles;
        }
    }

    /// Public profile only; the password hash never leaves the user store.
    fn event_payload(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(UserResponse::from(self))
    }
}

impl User {
    /// Draft carrying this user's current profile, for targeted updates.
    pub fn to_draft(&self) -> UserDraft {
        UserDraft {
            user_name: self.user_name.clone(),
            full_name: self.full_name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            password_hash: None,
            roles: None,
        }
    }
}

// == Refresh Token ==
/// Stored refresh token. The token value is opaque and only compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    pub id: String,
    pub user_id: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RefreshTokenDraft {
    pub user_id: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl RefreshToken {
    /// A token is expired from its expiry instant onwards.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl Entity for RefreshToken {
    const KIND: &'static str = "refreshTokens";
    const NAME: &'static str = "Refresh token";
    type Draft = RefreshTokenDraft;

    fn id(&self) -> &str {
        &self.id
    }

    fn create(id: String, draft: RefreshTokenDraft) -> Self {
        Self {
            id,
            user_id: draft.user_id,
            token: draft.token,
            created_at: draft.created_at,
            expires_at: draft.expires_at,
        }
    }

    fn apply(&mut self, draft: RefreshTokenDraft) {
        self.user_id = draft.user_id;
        self.token = draft.token;
        self.created_at = draft.created_at;
        self.expires_at = draft.expires_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_customer_apply_keeps_id() {
        let mut customer = Customer::create(
            "c1".to_string(),
            CustomerDraft {
                name: "Acme".to_string(),
                address: "Main St".to_string(),
                phone: "1".to_string(),
                email: String::new(),
            },
        );
        customer.apply(CustomerDraft {
            name: "Acme Ltd".to_string(),
            address: "High St".to_string(),
            phone: "2".to_string(),
            email: "a@acme.test".to_string(),
        });

        assert_eq!(customer.id, "c1");
        assert_eq!(customer.name, "Acme Ltd");
        assert_eq!(customer.address, "High St");
    }

    #[test]
    fn test_user_create_defaults_role() {
        let user = User::create(
            "u1".to_string(),
            UserDraft {
                user_name: "jane".to_string(),
                password_hash: Some("hash".to_string()),
                ..UserDraft::default()
            },
        );

        assert_eq!(user.roles, vec![DEFAULT_ROLE.to_string()]);
        assert_eq!(user.password_hash, "hash");
    }

    #[test]
    fn test_user_event_payload_has_no_hash() {
        let user = User::create(
            "u1".to_string(),
            UserDraft {
                user_name: "jane".to_string(),
                password_hash: Some("$argon2id$hash".to_string()),
                ..UserDraft::default()
            },
        );

        let payload = user.event_payload().unwrap();
        assert_eq!(payload["userName"], "jane");
        assert!(payload.get("passwordHash").is_none());
        assert!(!payload.to_string().contains("$argon2"));

        let customer = Customer::create(
            "c1".to_string(),
            CustomerDraft {
                name: "Acme".to_string(),
                address: String::new(),
                phone: String::new(),
                email: String::new(),
            },
        );
        assert_eq!(customer.event_payload().unwrap(), serde_json::to_value(&customer).unwrap());
    }

    #[test]
    fn test_user_apply_profile_keeps_credentials() {
        let mut user = User::create(
            "u1".to_string(),
            UserDraft {
                user_name: "jane".to_string(),
                password_hash: Some("hash".to_string()),
                ..UserDraft::default()
            },
        );
        user.apply(UserDraft {
            user_name: "jane.doe".to_string(),
            ..UserDraft::default()
        });

        assert_eq!(user.user_name, "jane.doe");
        assert_eq!(user.password_hash, "hash");
        assert_eq!(user.roles, vec![DEFAULT_ROLE.to_string()]);
    }

    #[test]
    fn test_user_draft_ignores_credentials_in_json() {
        let json = r#"{"userName":"jane","passwordHash":"x","roles":["Admin"]}"#;
        let draft: UserDraft = serde_json::from_str(json).unwrap();

        assert!(draft.password_hash.is_none());
        assert!(draft.roles.is_none());
    }

    #[test]
    fn test_refresh_token_expiry_boundary() {
        let now = Utc::now();
        let token = RefreshToken::create(
            "t1".to_string(),
            RefreshTokenDraft {
                user_id: "u1".to_string(),
                token: "abc".to_string(),
                created_at: now - Duration::minutes(5),
                expires_at: now,
            },
        );

        assert!(token.is_expired_at(now));
        assert!(!token.is_expired_at(now - Duration::seconds(1)));
    }
}
