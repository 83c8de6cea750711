//! API Routes
//!
//! Each resource is its own router carrying just the service it needs,
//! nested under `/api`.

use axum::{
    routing::{get, post},
    Router,
};
use serde::de::DeserializeOwned;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    actual_logs, create_entity, create_product, delete_entity, delete_product, delete_user,
    get_entity, get_log, get_product, get_user, get_user_by_name, health_handler, list_entities,
    list_logs, list_products, list_users, login, products_by_manufacturer, refresh_token, register,
    stats_handler, update_entity, update_product, update_user, AppState,
};
use crate::auth::AuthService;
use crate::models::Entity;
use crate::service::{EntityAccessService, LogService, ProductService, UserService};

/// CRUD routes for a kind with no behavior beyond [`EntityAccessService`].
pub fn entity_routes<E, S>(service: EntityAccessService<E>) -> Router<S>
where
    E: Entity,
    E::Draft: DeserializeOwned,
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_entities::<E>).post(create_entity::<E>))
        .route(
            "/:id",
            get(get_entity::<E>)
                .put(update_entity::<E>)
                .delete(delete_entity::<E>),
        )
        .with_state(service)
}

fn product_routes<S>(products: ProductService) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/manufacturer/:manufacturer_id", get(products_by_manufacturer))
        .with_state(products)
}

fn log_routes<S>(logs: LogService) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_logs))
        .route("/actual", get(actual_logs))
        .route("/:id", get(get_log))
        .with_state(logs)
}

fn user_routes<S>(users: UserService) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/name/:user_name", get(get_user_by_name))
        .with_state(users)
}

fn auth_routes<S>(auth: AuthService) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/:user_id/refresh", post(refresh_token))
        .with_state(auth)
}

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `/api/customers`, `/api/manufacturers` - CRUD
/// - `/api/products` - CRUD, `GET /api/products/manufacturer/:id`
/// - `/api/logs` - read, `GET /api/logs/actual` for the last 24 hours
/// - `/api/users` - read/update/delete, `GET /api/users/name/:user_name`
/// - `POST /api/auth/register`, `POST /api/auth/login`,
///   `POST /api/auth/:user_id/refresh`
/// - `GET /stats` - cache and degraded write counters
/// - `GET /health` - Health check endpoint
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let services = &state.services;
    let api = Router::new()
        .nest("/customers", entity_routes(services.customers.clone()))
        .nest("/manufacturers", entity_routes(services.manufacturers.clone()))
        .nest("/products", product_routes(services.products.clone()))
        .nest("/logs", log_routes(services.logs.clone()))
        .nest("/users", user_routes(services.users.clone()))
        .nest("/auth", auth_routes(state.auth.clone()));

    Router::new()
        .nest("/api", api)
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::service::Stores;
    use crate::store::RetryPolicy;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::util::ServiceExt;

    fn create_test_app(dir: &tempfile::TempDir) -> Router {
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let state = AppState::from_config(&config, Stores::in_memory(RetryPolicy::none()), None);
        create_router(state)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempfile::TempDir::new().unwrap();
        let response = create_test_app(&dir)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let dir = tempfile::TempDir::new().unwrap();
        let response = create_test_app(&dir)
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_customer_is_404() {
        let dir = tempfile::TempDir::new().unwrap();
        let response = create_test_app(&dir)
            .oneshot(
                Request::builder()
                    .uri("/api/customers/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_actual_logs_is_not_an_id() {
        let dir = tempfile::TempDir::new().unwrap();
        let response = create_test_app(&dir)
            .oneshot(Request::builder().uri("/api/logs/actual").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
