/// Authentication middleware for protecting routes
///
/// Validates the bearer session token through the `SessionManager` and
/// adds the authenticated user to request extensions.
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use uuid::Uuid;

/// Authenticated user extracted from the session token
///
/// Extract in handlers with `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Middleware that requires a valid session token
///
/// # Usage
///
/// ```ignore
/// use axum::{middleware, routing::put, Router};
/// use chirpy_api::auth::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/users", put(update_user))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = state.sessions.authenticate(request.headers())?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}
