//! Registration, login and refresh token rotation.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::password::{hash_password, verify_password, PasswordVerification};
use super::token::TokenIssuer;
use crate::error::{Result, ServiceError};
use crate::models::{
    LoginRequest, RefreshToken, RefreshTokenDraft, RegisterRequest, User, UserAuthenticated,
    UserDraft, UserResponse, DEFAULT_ROLE,
};
use crate::service::{DegradedWrite, EntityAccessService, Tier, UserService};

#[derive(Clone)]
pub struct AuthService {
    users: UserService,
    refresh_tokens: EntityAccessService<RefreshToken>,
    issuer: Arc<TokenIssuer>,
}

/// Argon2 is CPU bound; keep it off the async workers.
async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Infrastructure(format!("Hashing task failed: {e}")))?
        .map_err(|e| ServiceError::Infrastructure(format!("Failed to hash password: {e}")))
}

async fn verify_blocking(password: String, hash: String) -> Result<PasswordVerification> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ServiceError::Infrastructure(format!("Verification task failed: {e}")))
}

impl AuthService {
    pub fn new(
        users: UserService,
        refresh_tokens: EntityAccessService<RefreshToken>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            issuer,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<UserResponse> {
        let password_hash = hash_blocking(request.password).await?;
        let draft = UserDraft {
            user_name: request.user_name,
            full_name: request.full_name,
            email: request.email,
            phone: request.phone,
            password_hash: Some(password_hash),
            roles: Some(vec![DEFAULT_ROLE.to_string()]),
        };

        let user = self.users.access().create(draft).await?.entity;
        info!(user_id = %user.id, user_name = %user.user_name, "User registered");
        Ok(UserResponse::from(user))
    }

    /// Checks the password and issues a token pair. Nothing is issued on a
    /// wrong password.
    pub async fn login(&self, request: LoginRequest) -> Result<UserAuthenticated> {
        let user = self.users.get_by_username(&request.user_name).await?;

        match verify_blocking(request.password.clone(), user.password_hash.clone()).await? {
            PasswordVerification::Failed => {
                warn!(user_name = %user.user_name, "Login rejected");
                return Err(ServiceError::invalid_credentials("password", "Invalid password"));
            }
            PasswordVerification::SuccessRehashNeeded => {
                self.rehash(&user, &request.password).await;
            }
            PasswordVerification::Success => {}
        }

        self.issue(user).await
    }

    /// Swaps a valid refresh token for a new pair.
    ///
    /// The new token is stored before the old one is deleted; the two store
    /// calls are not atomic. A failed delete leaves the old token valid and is
    /// reported as a degraded write, the new pair is still returned.
    pub async fn refresh_token(&self, user_id: &str, token: &str) -> Result<UserAuthenticated> {
        let user = self.users.access().get(user_id).await?;

        let stored = self
            .refresh_tokens
            .find(|t| t.user_id == user_id && t.token == token)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::not_found("token", "Refresh token not found"))?;

        if stored.is_expired_at(Utc::now()) {
            return Err(ServiceError::token_expired("token", "Token is expired"));
        }

        let authenticated = self.issue(user).await?;
        if let Err(err) = self.refresh_tokens.delete(&stored.id).await {
            self.refresh_tokens.report_degraded(
                &stored.id,
                DegradedWrite {
                    tier: Tier::Store,
                    reason: format!("old refresh token not revoked: {err}"),
                },
            );
        }
        Ok(authenticated)
    }

    async fn issue(&self, user: User) -> Result<UserAuthenticated> {
        let access_token = self.issuer.access_token(&user)?;
        let now = Utc::now();
        let refresh = RefreshTokenDraft {
            user_id: user.id.clone(),
            token: self.issuer.refresh_token(),
            created_at: now,
            expires_at: self.issuer.refresh_expiry(now),
        };
        let refresh_token = self.refresh_tokens.create(refresh).await?.entity.token;

        Ok(UserAuthenticated {
            user: UserResponse::from(user),
            access_token,
            refresh_token,
        })
    }

    async fn rehash(&self, user: &User, password: &str) {
        let result = async {
            let password_hash = hash_blocking(password.to_string()).await?;
            let draft = UserDraft {
                password_hash: Some(password_hash),
                ..user.to_draft()
            };
            self.users.access().update(&user.id, draft).await
        }
        .await;

        match result {
            Ok(_) => info!(user_id = %user.id, "Password hash upgraded"),
            Err(err) => warn!(user_id = %user.id, error = %err, "Password rehash failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheLayer;
    use crate::config::CacheSettings;
    use crate::error::StoreError;
    use crate::files::FileFallbackStore;
    use crate::models::Entity;
    use crate::service::testing;
    use crate::store::{DocumentCollection, EntityStore, Filter, InMemoryCollection};
    use async_trait::async_trait;
    use chrono::Duration;

    fn auth(ctx: &testing::TestContext) -> AuthService {
        AuthService::new(
            ctx.services.users.clone(),
            ctx.services.refresh_tokens.clone(),
            Arc::new(TokenIssuer::new(ctx.config.jwt.clone())),
        )
    }

    fn register_request(user_name: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            user_name: user_name.to_string(),
            password: password.to_string(),
            email: format!("{user_name}@example.test"),
            full_name: String::new(),
            phone: String::new(),
        }
    }

    fn login_request(user_name: &str, password: &str) -> LoginRequest {
        LoginRequest {
            user_name: user_name.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let ctx = testing::context().await;
        let auth = auth(&ctx);

        let registered = auth.register(register_request("jane", "s3cret")).await.unwrap();
        assert_eq!(registered.roles, vec![DEFAULT_ROLE.to_string()]);
        let stored = ctx.stores.users.get(&registered.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "s3cret");

        let session = auth.login(login_request("jane", "s3cret")).await.unwrap();
        assert_eq!(session.user, registered);
        let claims = auth.issuer().validate(&session.access_token).unwrap();
        assert_eq!(claims.id, registered.id);

        let tokens = ctx.stores.refresh_tokens.get_all().await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token, session.refresh_token);
        assert_eq!(tokens[0].user_id, registered.id);
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_issues_nothing() {
        let ctx = testing::context().await;
        let auth = auth(&ctx);
        auth.register(register_request("jane", "s3cret")).await.unwrap();

        let err = auth.login(login_request("jane", "guess")).await.unwrap_err();

        assert!(matches!(err, ServiceError::InvalidCredentials { ref field, .. } if field == "password"));
        assert!(ctx.stores.refresh_tokens.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_login_unknown_user() {
        let ctx = testing::context().await;

        let err = auth(&ctx).login(login_request("ghost", "x")).await.unwrap_err();
        assert_eq!(err.field(), Some("userName"));
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let ctx = testing::context().await;
        let auth = auth(&ctx);
        let user = auth.register(register_request("jane", "s3cret")).await.unwrap();
        let first = auth.login(login_request("jane", "s3cret")).await.unwrap();

        let second = auth.refresh_token(&user.id, &first.refresh_token).await.unwrap();

        assert_ne!(second.refresh_token, first.refresh_token);
        let claims = auth.issuer().validate(&second.access_token).unwrap();
        assert_eq!(claims.id, user.id);
        assert_eq!(claims.username, "jane");
        assert_eq!(claims.role, vec![DEFAULT_ROLE.to_string()]);
        assert_eq!(second.user, user);

        let tokens = ctx.stores.refresh_tokens.get_all().await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token, second.refresh_token);

        let reused = auth.refresh_token(&user.id, &first.refresh_token).await.unwrap_err();
        assert!(matches!(reused, ServiceError::NotFound { .. }));
    }

    /// Token collection whose deletes always fail.
    #[derive(Default)]
    struct NoDeletes {
        inner: InMemoryCollection<RefreshToken>,
    }

    #[async_trait]
    impl DocumentCollection<RefreshToken> for NoDeletes {
        async fn find_all(&self) -> std::result::Result<Vec<RefreshToken>, StoreError> {
            self.inner.find_all().await
        }

        async fn find_by_id(&self, id: &str) -> std::result::Result<Option<RefreshToken>, StoreError> {
            self.inner.find_by_id(id).await
        }

        async fn find_by_ids(&self, ids: &[String]) -> std::result::Result<Vec<RefreshToken>, StoreError> {
            self.inner.find_by_ids(ids).await
        }

        async fn find_where(
            &self,
            filter: &Filter<'_, RefreshToken>,
        ) -> std::result::Result<Vec<RefreshToken>, StoreError> {
            self.inner.find_where(filter).await
        }

        async fn insert(&self, entity: &RefreshToken) -> std::result::Result<(), StoreError> {
            self.inner.insert(entity).await
        }

        async fn replace(&self, entity: &RefreshToken) -> std::result::Result<(), StoreError> {
            self.inner.replace(entity).await
        }

        async fn delete(&self, _id: &str) -> std::result::Result<bool, StoreError> {
            Err(StoreError::Unavailable("delete refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_revocation_still_returns_new_pair() {
        let ctx = testing::context().await;
        let tokens = EntityAccessService::new(
            EntityStore::new(Arc::new(NoDeletes::default()), testing::quick_retry()),
            CacheLayer::new(),
            CacheSettings::default(),
            FileFallbackStore::new(ctx.dir.path()),
        );
        let auth = AuthService::new(
            ctx.services.users.clone(),
            tokens.clone(),
            Arc::new(TokenIssuer::new(ctx.config.jwt.clone())),
        );
        let user = auth.register(register_request("jane", "s3cret")).await.unwrap();
        let first = auth.login(login_request("jane", "s3cret")).await.unwrap();

        let second = auth.refresh_token(&user.id, &first.refresh_token).await.unwrap();

        assert_ne!(second.refresh_token, first.refresh_token);
        assert_eq!(tokens.stats().degraded_writes, 1);
        let stored = tokens.get_all().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().any(|t| t.token == second.refresh_token));
    }

    #[tokio::test]
    async fn test_expired_refresh_token_is_not_rotated() {
        let ctx = testing::context().await;
        let auth = auth(&ctx);
        let user = auth.register(register_request("jane", "s3cret")).await.unwrap();
        let now = Utc::now();
        let expired = RefreshToken::create(
            "t1".to_string(),
            RefreshTokenDraft {
                user_id: user.id.clone(),
                token: "old".to_string(),
                created_at: now - Duration::days(8),
                expires_at: now - Duration::seconds(1),
            },
        );
        ctx.stores.refresh_tokens.create(&expired).await.unwrap();

        let err = auth.refresh_token(&user.id, "old").await.unwrap_err();

        assert!(matches!(err, ServiceError::TokenExpired { .. }));
        assert_eq!(ctx.stores.refresh_tokens.get_all().await.unwrap(), vec![expired]);
    }

    #[tokio::test]
    async fn test_refresh_for_unknown_user() {
        let ctx = testing::context().await;

        let err = auth(&ctx).refresh_token("nobody", "x").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_outdated_hash_is_upgraded_on_login() {
        use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
        use argon2::{Algorithm, Argon2, Params, Version};

        let ctx = testing::context().await;
        let auth = auth(&ctx);
        let weak = Argon2::new(
            Algorithm::Argon2id,
            Version::V0x13,
            Params::new(8 * 1024, 1, 1, None).unwrap(),
        );
        let salt = SaltString::generate(&mut OsRng);
        let old_hash = weak.hash_password(b"s3cret", &salt).unwrap().to_string();
        let user = ctx
            .services
            .users
            .access()
            .create(UserDraft {
                user_name: "legacy".to_string(),
                password_hash: Some(old_hash.clone()),
                ..UserDraft::default()
            })
            .await
            .unwrap()
            .entity;

        auth.login(login_request("legacy", "s3cret")).await.unwrap();

        let stored = ctx.stores.users.get(&user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, old_hash);
        assert_eq!(
            verify_password("s3cret", &stored.password_hash),
            PasswordVerification::Success
        );
    }
}
