//! Chirp handlers
//!
//! Create, list, fetch and delete short posts. Every route sits behind the
//! session token middleware; only the author may delete a chirp.

use crate::audit::{audit_log, AuditEvent};
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chirpy_core::ChirpRecord;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Longest accepted chirp, in characters
pub const MAX_CHIRP_LENGTH: usize = 140;

const BANNED_WORDS_PATTERN: &str = "(?i)kerfuffle|sharbert|fornax";
const CENSORED: &str = "****";

static BANNED_WORDS: OnceCell<Regex> = OnceCell::new();

#[derive(Debug, Error)]
pub enum ChirpBodyError {
    #[error("Chirp is too long: {0} characters, at most 140 allowed")]
    TooLong(usize),

    #[error("Banned word filter unavailable: {0}")]
    Filter(#[from] regex::Error),
}

impl From<ChirpBodyError> for AppError {
    fn from(err: ChirpBodyError) -> Self {
        match err {
            e @ ChirpBodyError::TooLong(_) => AppError::BadRequest(e.to_string()),
            ChirpBodyError::Filter(e) => AppError::Internal(e.to_string()),
        }
    }
}

/// Enforce the length limit and mask banned words
///
/// Banned words match case-insensitively anywhere in the body and are
/// replaced with `****`; everything else is kept as written.
pub fn clean_chirp_body(body: &str) -> Result<String, ChirpBodyError> {
    let length = body.chars().count();
    if length > MAX_CHIRP_LENGTH {
        return Err(ChirpBodyError::TooLong(length));
    }

    let banned = BANNED_WORDS.get_or_try_init(|| Regex::new(BANNED_WORDS_PATTERN))?;
    Ok(banned.replace_all(body, CENSORED).into_owned())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateChirpRequest {
    #[schema(example = "I had something interesting for breakfast")]
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChirpResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    /// Author
    pub user_id: Uuid,
}

impl From<ChirpRecord> for ChirpResponse {
    fn from(chirp: ChirpRecord) -> Self {
        Self {
            id: chirp.id,
            created_at: chirp.created_at,
            updated_at: chirp.updated_at,
            body: chirp.body,
            user_id: chirp.user_id,
        }
    }
}

/// Query parameters for chirp listing
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListChirpsQuery {
    /// Only chirps by this user
    pub author_id: Option<String>,

    /// `asc` (default) or `desc` by creation time; other values keep the default
    pub sort: Option<String>,
}

/// Post a chirp as the authenticated user
#[utoipa::path(
    post,
    path = "/api/chirps",
    tag = "chirps",
    request_body = CreateChirpRequest,
    responses(
        (status = 201, description = "Chirp created", body = ChirpResponse),
        (status = 400, description = "Chirp too long", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid session token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_chirp_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(req): Json<CreateChirpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let body = clean_chirp_body(&req.body)?;

    let chirp = match state.store.create_chirp(&body, user.user_id).await {
        Ok(chirp) => chirp,
        // Token subject deleted since the token was issued
        Err(chirpy_core::StoreError::UserNotFound) => return Err(AppError::Unauthorized),
        Err(e) => return Err(e.into()),
    };
    tracing::debug!(chirp_id = %chirp.id, user_id = %user.user_id, "Chirp created");

    Ok((StatusCode::CREATED, Json(ChirpResponse::from(chirp))))
}

/// List chirps, optionally by one author
#[utoipa::path(
    get,
    path = "/api/chirps",
    tag = "chirps",
    params(ListChirpsQuery),
    responses(
        (status = 200, description = "Chirps", body = [ChirpResponse]),
        (status = 400, description = "Malformed author id", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid session token", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_chirps_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListChirpsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = params
        .author_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .map(|id| parse_id(id, "author id"))
        .transpose()?;

    let mut chirps = state.store.list_chirps(author_id).await?;
    if params.sort.as_deref() == Some("desc") {
        chirps.reverse();
    }

    let chirps: Vec<ChirpResponse> = chirps.into_iter().map(ChirpResponse::from).collect();
    Ok((StatusCode::OK, Json(chirps)))
}

/// Get a single chirp
#[utoipa::path(
    get,
    path = "/api/chirps/{id}",
    tag = "chirps",
    params(
        ("id" = Uuid, Path, description = "Chirp UUID")
    ),
    responses(
        (status = 200, description = "Chirp", body = ChirpResponse),
        (status = 400, description = "Malformed chirp id", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid session token", body = crate::error::ApiError),
        (status = 404, description = "Chirp not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_chirp_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let chirp_id = parse_id(&id, "chirp id")?;

    let chirp = state
        .store
        .get_chirp(chirp_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chirp".to_string()))?;

    Ok((StatusCode::OK, Json(ChirpResponse::from(chirp))))
}

/// Delete one of the caller's chirps
#[utoipa::path(
    delete,
    path = "/api/chirps/{id}",
    tag = "chirps",
    params(
        ("id" = Uuid, Path, description = "Chirp UUID")
    ),
    responses(
        (status = 204, description = "Chirp deleted"),
        (status = 400, description = "Malformed chirp id", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid session token", body = crate::error::ApiError),
        (status = 403, description = "Chirp belongs to another user", body = crate::error::ApiError),
        (status = 404, description = "Chirp not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_chirp_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let chirp_id = parse_id(&id, "chirp id")?;

    let chirp = state
        .store
        .get_chirp(chirp_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Chirp".to_string()))?;

    if chirp.user_id != user.user_id {
        audit_log(&AuditEvent::ChirpDeleteDenied {
            user_id: user.user_id,
            chirp_id,
        });
        return Err(AppError::Forbidden(
            "Chirp belongs to another user".to_string(),
        ));
    }

    // A concurrent delete already removed it
    if !state.store.delete_chirp(chirp_id).await? {
        return Err(AppError::NotFound("Chirp".to_string()));
    }
    tracing::debug!(chirp_id = %chirp_id, user_id = %user.user_id, "Chirp deleted");

    Ok(StatusCode::NO_CONTENT)
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_body_masks_banned_words_in_any_case() {
        let cleaned = clean_chirp_body("This is a kerfuffle opinion I need to share with the world")
            .unwrap();
        assert_eq!(cleaned, "This is a **** opinion I need to share with the world");

        let cleaned = clean_chirp_body("Sharbert! and FORNAX, Kerfuffle").unwrap();
        assert_eq!(cleaned, "****! and ****, ****");
    }

    #[test]
    fn test_clean_body_leaves_other_text_alone() {
        let body = "I hear Mastodon is better than Chirpy. sharbert I need to migrate";
        assert_eq!(
            clean_chirp_body(body).unwrap(),
            "I hear Mastodon is better than Chirpy. **** I need to migrate"
        );
        assert_eq!(clean_chirp_body("").unwrap(), "");
    }

    #[test]
    fn test_length_limit_counts_characters() {
        let at_limit = "a".repeat(MAX_CHIRP_LENGTH);
        assert_eq!(clean_chirp_body(&at_limit).unwrap(), at_limit);

        let multibyte = "é".repeat(MAX_CHIRP_LENGTH);
        assert!(clean_chirp_body(&multibyte).is_ok());

        let over = "a".repeat(MAX_CHIRP_LENGTH + 1);
        assert!(matches!(
            clean_chirp_body(&over),
            Err(ChirpBodyError::TooLong(141))
        ));
    }

    #[test]
    fn test_too_long_maps_to_bad_request() {
        let err = AppError::from(ChirpBodyError::TooLong(200));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
