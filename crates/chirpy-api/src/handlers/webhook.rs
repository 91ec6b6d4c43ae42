//! Payment provider webhook
//!
//! Polka calls this endpoint with `Authorization: ApiKey <key>`. Only the
//! `user.upgraded` event does anything; every other event is acknowledged
//! with 204 so the provider stops retrying. The body is parsed only after
//! the API key is accepted.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{api_key_matches, extract_api_key};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

const USER_UPGRADED_EVENT: &str = "user.upgraded";

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PolkaWebhookData {
    /// Upgraded user id; parsed by the handler so a bad value yields 400
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PolkaWebhook {
    pub event: String,
    /// Absent on events that carry no user
    #[serde(default)]
    pub data: PolkaWebhookData,
}

/// Handle a Polka payment event
#[utoipa::path(
    post,
    path = "/api/polka/webhooks",
    tag = "webhooks",
    request_body = PolkaWebhook,
    responses(
        (status = 204, description = "Event accepted"),
        (status = 400, description = "Malformed body or user id", body = crate::error::ApiError),
        (status = 401, description = "Missing or wrong API key", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    )
)]
pub async fn polka_webhook_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let expected = &state.config.auth.polka_key;
    let authorized = match extract_api_key(&headers) {
        Ok(key) => !expected.is_empty() && api_key_matches(expected, &key),
        Err(_) => false,
    };

    if !authorized {
        audit_log(&AuditEvent::InvalidToken {
            ip_address: extract_ip_address(&headers),
            user_agent: extract_user_agent(&headers),
            reason: "webhook API key rejected".to_string(),
        });
        return Err(AppError::Unauthorized);
    }

    let webhook: PolkaWebhook = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid webhook body: {e}")))?;

    if webhook.event != USER_UPGRADED_EVENT {
        tracing::debug!(event = %webhook.event, "Ignoring webhook event");
        return Ok(StatusCode::NO_CONTENT);
    }

    let user_id = Uuid::parse_str(&webhook.data.user_id)
        .map_err(|_| AppError::BadRequest("Invalid user id".to_string()))?;

    state.store.upgrade_user_to_chirpy_red(user_id).await?;
    audit_log(&AuditEvent::ChirpyRedUpgrade { user_id });

    Ok(StatusCode::NO_CONTENT)
}
