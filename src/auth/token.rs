//! Access and refresh token issuing.
//!
//! Access tokens are HS256 JWTs carrying the user's id, name, email and
//! roles. Refresh tokens are 32 random bytes in standard base64; they mean
//! nothing on their own and are only compared against the stored copy.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::error::{Result, ServiceError};
use crate::models::User;

/// Refresh token entropy in bytes.
pub const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Vec<String>,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

pub struct TokenIssuer {
    settings: JwtSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenIssuer {
    pub fn new(settings: JwtSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            settings,
        }
    }

    pub fn settings(&self) -> &JwtSettings {
        &self.settings
    }

    pub fn access_token(&self, user: &User) -> Result<String> {
        self.access_token_at(user, Utc::now())
    }

    pub(crate) fn access_token_at(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
        let expires = now + Duration::minutes(self.settings.access_token_expiration_minutes);
        let claims = Claims {
            id: user.id.clone(),
            username: user.user_name.clone(),
            email: user.email.clone(),
            role: user.roles.clone(),
            exp: expires.timestamp(),
            iat: now.timestamp(),
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Infrastructure(format!("Failed to sign token: {e}")))
    }

    /// Checks signature, issuer, audience and expiry of an access token.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.settings.issuer]);
        validation.set_audience(&[&self.settings.audience]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    ServiceError::token_expired("token", "Token is expired")
                }
                _ => ServiceError::invalid_credentials("token", format!("Invalid token: {e}")),
            })
    }

    /// Fresh opaque refresh token value.
    pub fn refresh_token(&self) -> String {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        STANDARD.encode(bytes)
    }

    /// Expiry of a refresh token issued at `now`.
    pub fn refresh_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::minutes(self.settings.refresh_token_expiration_minutes)
    }
}
