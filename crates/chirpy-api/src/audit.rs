//! Security audit logging for authentication events
//!
//! Every session outcome that matters to an operator (logins, refreshes,
//! revocations, registrations, credential changes, webhook upgrades, denied
//! chirp deletes) is emitted here at INFO level on the "audit" target.
//! Failure events carry the precise cause that clients never see.
//!
//! # Example
//!
//! ```ignore
//! use chirpy_api::audit::{audit_log, AuditEvent};
//!
//! audit_log(&AuditEvent::LoginSuccess {
//!     user_id: user.id,
//!     email: user.email.clone(),
//! });
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Security audit events for the session lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Successful login; a session and a refresh token were issued
    LoginSuccess { user_id: Uuid, email: String },

    /// Failed login; `reason` tells unknown email from wrong password
    LoginFailure { email: String, reason: String },

    /// New session token minted from a refresh token
    TokenRefresh {
        user_id: Uuid,
        ip_address: Option<String>,
    },

    /// Refresh token revoked
    TokenRevoked { ip_address: Option<String> },

    /// A bearer, refresh token or API key was rejected
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },

    /// Successful user registration
    RegistrationSuccess { user_id: Uuid, email: String },

    /// Failed registration attempt
    RegistrationFailure { email: String, reason: String },

    /// Email and password replaced by the authenticated user
    CredentialsUpdated { user_id: Uuid, email: String },

    /// Payment webhook upgraded a user to Chirpy Red
    ChirpyRedUpgrade { user_id: Uuid },

    /// All users and refresh tokens deleted through the dev reset
    StoreReset { ip_address: Option<String> },

    /// Authenticated user tried to delete someone else's chirp
    ChirpDeleteDenied { user_id: Uuid, chirp_id: Uuid },
}

/// Log a security audit event with structured fields
///
/// The event is also serialized whole into the `event` field so log
/// aggregators get one JSON object per event.
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::LoginSuccess { user_id, email } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                "Login successful"
            );
        }
        AuditEvent::LoginFailure { email, reason } => {
            info!(
                target: "audit",
                event = %event_json,
                email = %email,
                reason = %reason,
                "Login failed"
            );
        }
        AuditEvent::TokenRefresh {
            user_id,
            ip_address,
        } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                ip_address = ?ip_address,
                "Token refresh"
            );
        }
        AuditEvent::TokenRevoked { ip_address } => {
            info!(
                target: "audit",
                event = %event_json,
                ip_address = ?ip_address,
                "Refresh token revoked"
            );
        }
        AuditEvent::InvalidToken {
            ip_address, reason, ..
        } => {
            info!(
                target: "audit",
                event = %event_json,
                ip_address = ?ip_address,
                reason = %reason,
                "Invalid token"
            );
        }
        AuditEvent::RegistrationSuccess { user_id, email } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                "Registration successful"
            );
        }
        AuditEvent::RegistrationFailure { email, reason } => {
            info!(
                target: "audit",
                event = %event_json,
                email = %email,
                reason = %reason,
                "Registration failed"
            );
        }
        AuditEvent::CredentialsUpdated { user_id, email } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                email = %email,
                "Credentials updated"
            );
        }
        AuditEvent::ChirpyRedUpgrade { user_id } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                "User upgraded to Chirpy Red"
            );
        }
        AuditEvent::StoreReset { ip_address } => {
            info!(
                target: "audit",
                event = %event_json,
                ip_address = ?ip_address,
                "All users deleted"
            );
        }
        AuditEvent::ChirpDeleteDenied { user_id, chirp_id } => {
            info!(
                target: "audit",
                event = %event_json,
                user_id = %user_id,
                chirp_id = %chirp_id,
                "Chirp delete denied"
            );
        }
    }
}

/// Extract the client IP from proxy headers
///
/// Checks X-Forwarded-For (first hop) and then X-Real-IP.
pub fn extract_ip_address(headers: &axum::http::HeaderMap) -> Option<String> {
    if let Some(xff) = headers.get("x-forwarded-for") {
        if let Ok(xff_str) = xff.to_str() {
            if let Some(first_ip) = xff_str.split(',').next() {
                return Some(first_ip.trim().to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|ip| ip.to_str().ok())
        .map(|s| s.to_string())
}

pub fn extract_user_agent(headers: &axum::http::HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
