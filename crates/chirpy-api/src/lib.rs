//! Chirpy API - HTTP server and authentication subsystem
//!
//! Provides the registration, login, session refresh/revoke, credential
//! update, chirp and payment webhook endpoints on top of `chirpy-core`
//! storage.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::{routing::get, Json, Router};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI document served at `/api-docs/openapi.json`
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::health::reset_handler,
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::refresh_handler,
        handlers::auth::revoke_handler,
        handlers::auth::update_user_handler,
        handlers::chirps::create_chirp_handler,
        handlers::chirps::list_chirps_handler,
        handlers::chirps::get_chirp_handler,
        handlers::chirps::delete_chirp_handler,
        handlers::webhook::polka_webhook_handler,
    ),
    components(schemas(
        error::ApiError,
        handlers::health::HealthResponse,
        handlers::health::ResetResponse,
        handlers::auth::CredentialsRequest,
        handlers::auth::UserResponse,
        handlers::auth::LoginResponse,
        handlers::auth::TokenResponse,
        handlers::chirps::CreateChirpRequest,
        handlers::chirps::ChirpResponse,
        handlers::webhook::PolkaWebhook,
        handlers::webhook::PolkaWebhookData,
    )),
    modifiers(&BearerSecurity),
    tags(
        (name = "auth", description = "Registration, login and session tokens"),
        (name = "chirps", description = "Short posts by authenticated users"),
        (name = "webhooks", description = "Payment provider callbacks"),
        (name = "health", description = "Liveness probe"),
        (name = "admin", description = "Development-only maintenance"),
    )
)]
pub struct ApiDoc;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", routes::api_routes(state.clone()))
        .nest("/admin", routes::admin_routes())
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Webhook API key configured by the test router
#[cfg(any(test, feature = "test-utils"))]
pub const TEST_POLKA_KEY: &str = "f271c81ff7084ee5b99a5091b42d486e";

/// Signing secret configured by the test router
#[cfg(any(test, feature = "test-utils"))]
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-for-integration-tests";

/// Configuration used by the test routers: dev platform, in-memory store
#[cfg(any(test, feature = "test-utils"))]
pub fn test_config() -> chirpy_core::AppConfig {
    let mut config = chirpy_core::AppConfig::default();
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    config.auth.polka_key = TEST_POLKA_KEY.to_string();
    config.platform = "dev".to_string();
    config
}

/// Router over a fresh in-memory store with cheap password hashing
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing_with_config(config: chirpy_core::AppConfig) -> Router {
    let store: Arc<dyn chirpy_core::AuthStore> = Arc::new(chirpy_core::MemoryAuthStore::new());
    let sessions = auth::SessionManager::from_config(store.clone(), &config.auth)
        .expect("test config has representable token lifetimes")
        .with_password_config(auth::PasswordConfig::fast_insecure());

    create_router(Arc::new(AppState::with_sessions(config, store, sessions)))
}

#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router_for_testing_with_config(test_config())
}
