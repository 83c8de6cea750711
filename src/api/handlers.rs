//! API Handlers
//!
//! Thin adapters from HTTP onto the services. Entity kinds without extra
//! behavior share the generic handlers below.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::de::DeserializeOwned;

use crate::auth::{AuthService, TokenIssuer};
use crate::config::Config;
use crate::error::Result;
use crate::messaging::EventPublisher;
use crate::models::{
    Entity, HealthResponse, Log, LoginRequest, Product, ProductInput, RegisterRequest,
    StatsResponse, TokenRequest, UserAuthenticated, UserDraft, UserResponse,
};
use crate::service::{EntityAccessService, LogService, ProductService, Services, Stores, UserService};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(services: Services, auth: AuthService) -> Self {
        Self { services, auth }
    }

    /// Wires services and auth over `stores`.
    pub fn from_config(
        config: &Config,
        stores: Stores,
        publisher: Option<Arc<dyn EventPublisher>>,
    ) -> Self {
        let services = Services::new(config, stores, publisher);
        let auth = AuthService::new(
            services.users.clone(),
            services.refresh_tokens.clone(),
            Arc::new(TokenIssuer::new(config.jwt.clone())),
        );
        Self::new(services, auth)
    }
}

// == Generic Entity Handlers ==
pub async fn list_entities<E: Entity>(
    State(service): State<EntityAccessService<E>>,
) -> Result<Json<Vec<E>>> {
    Ok(Json(service.get_all().await?))
}

pub async fn get_entity<E: Entity>(
    State(service): State<EntityAccessService<E>>,
    Path(id): Path<String>,
) -> Result<Json<E>> {
    Ok(Json(service.get(&id).await?))
}

pub async fn create_entity<E>(
    State(service): State<EntityAccessService<E>>,
    Json(draft): Json<E::Draft>,
) -> Result<(StatusCode, Json<E>)>
where
    E: Entity,
    E::Draft: DeserializeOwned,
{
    let written = service.create(draft).await?;
    Ok((StatusCode::CREATED, Json(written.entity)))
}

pub async fn update_entity<E>(
    State(service): State<EntityAccessService<E>>,
    Path(id): Path<String>,
    Json(draft): Json<E::Draft>,
) -> Result<Json<E>>
where
    E: Entity,
    E::Draft: DeserializeOwned,
{
    Ok(Json(service.update(&id, draft).await?.entity))
}

pub async fn delete_entity<E: Entity>(
    State(service): State<EntityAccessService<E>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    service.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// == Products ==
pub async fn list_products(State(products): State<ProductService>) -> Result<Json<Vec<Product>>> {
    Ok(Json(products.access().get_all().await?))
}

pub async fn get_product(
    State(products): State<ProductService>,
    Path(id): Path<String>,
) -> Result<Json<Product>> {
    Ok(Json(products.access().get(&id).await?))
}

pub async fn create_product(
    State(products): State<ProductService>,
    Json(input): Json<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let written = products.create(input).await?;
    Ok((StatusCode::CREATED, Json(written.entity)))
}

pub async fn update_product(
    State(products): State<ProductService>,
    Path(id): Path<String>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    Ok(Json(products.update(&id, input).await?.entity))
}

pub async fn delete_product(
    State(products): State<ProductService>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    products.access().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn products_by_manufacturer(
    State(products): State<ProductService>,
    Path(manufacturer_id): Path<String>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(products.by_manufacturer(&manufacturer_id).await?))
}

// == Logs ==
pub async fn list_logs(State(logs): State<LogService>) -> Result<Json<Vec<Log>>> {
    Ok(Json(logs.access().get_all().await?))
}

pub async fn actual_logs(State(logs): State<LogService>) -> Result<Json<Vec<Log>>> {
    Ok(Json(logs.actual().await?))
}

pub async fn get_log(State(logs): State<LogService>, Path(id): Path<String>) -> Result<Json<Log>> {
    Ok(Json(logs.access().get(&id).await?))
}

// == Users ==
// Users never leave the service with their password hash.
pub async fn list_users(State(users): State<UserService>) -> Result<Json<Vec<UserResponse>>> {
    let all = users.access().get_all().await?;
    Ok(Json(all.iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(users): State<UserService>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>> {
    Ok(Json(users.access().get(&id).await?.into()))
}

pub async fn get_user_by_name(
    State(users): State<UserService>,
    Path(user_name): Path<String>,
) -> Result<Json<UserResponse>> {
    Ok(Json(users.get_by_username(&user_name).await?.into()))
}

pub async fn update_user(
    State(users): State<UserService>,
    Path(id): Path<String>,
    Json(draft): Json<UserDraft>,
) -> Result<Json<UserResponse>> {
    Ok(Json(users.access().update(&id, draft).await?.entity.into()))
}

pub async fn delete_user(
    State(users): State<UserService>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    users.access().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// == Auth ==
pub async fn register(
    State(auth): State<AuthService>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>)> {
    Ok((StatusCode::CREATED, Json(auth.register(request).await?)))
}

pub async fn login(
    State(auth): State<AuthService>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<UserAuthenticated>> {
    Ok(Json(auth.login(request).await?))
}

pub async fn refresh_token(
    State(auth): State<AuthService>,
    Path(user_id): Path<String>,
    Json(request): Json<TokenRequest>,
) -> Result<Json<UserAuthenticated>> {
    Ok(Json(auth.refresh_token(&user_id, &request.refresh_token).await?))
}

// == Service Endpoints ==
/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let cache = state.services.cache.stats().await;
    let services = &state.services;
    let degraded_writes = [
        services.customers.stats(),
        services.manufacturers.stats(),
        services.products.access().stats(),
        services.logs.access().stats(),
        services.users.access().stats(),
        services.refresh_tokens.stats(),
    ]
    .iter()
    .map(|s| s.degraded_writes)
    .sum();

    Json(StatsResponse {
        cache_hits: cache.hits,
        cache_misses: cache.misses,
        cache_expirations: cache.expirations,
        cache_entries: cache.total_entries,
        cache_hit_rate: cache.hit_rate(),
        degraded_writes,
    })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
