//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, chirps, health, webhook};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

/// Routes mounted under `/api`
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no session token required)
    let public_routes = Router::new()
        .route("/healthz", get(health::health_check))
        .route("/users", post(auth::register_handler))
        .route("/login", post(auth::login_handler))
        // Bearer refresh token, checked by the handler
        .route("/refresh", post(auth::refresh_handler))
        .route("/revoke", post(auth::revoke_handler))
        // ApiKey auth, checked by the handler
        .route("/polka/webhooks", post(webhook::polka_webhook_handler));

    // Protected routes (session token required)
    let protected_routes = Router::new()
        .route("/users", put(auth::update_user_handler))
        .route(
            "/chirps",
            get(chirps::list_chirps_handler).post(chirps::create_chirp_handler),
        )
        .route(
            "/chirps/:id",
            get(chirps::get_chirp_handler).delete(chirps::delete_chirp_handler),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Routes mounted under `/admin`
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new().route("/reset", post(health::reset_handler))
}
