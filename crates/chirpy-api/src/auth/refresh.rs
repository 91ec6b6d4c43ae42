//! Refresh token lifecycle
//!
//! Refresh tokens are opaque 64-character hex strings (32 bytes from the
//! OS RNG). A token is created on login, redeemed any number of times
//! until it expires or is revoked, and never deleted except by the bulk
//! user reset.

use chirpy_core::{AuthStore, StoreError};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Raw token length in bytes before hex encoding
const REFRESH_TOKEN_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum RefreshTokenError {
    #[error("Failed to generate refresh token: {0}")]
    Generation(String),

    #[error("Refresh token not found")]
    NotFound,

    #[error("Refresh token expired")]
    Expired,

    #[error("Refresh token revoked")]
    Revoked,

    #[error("Refresh token lifetime out of range: {0}")]
    LifetimeOutOfRange(Duration),

    #[error("Refresh token storage failed: {0}")]
    Storage(#[from] StoreError),
}

/// Generate a fresh refresh token value
///
/// Fails only when the OS random source fails; the caller treats that as
/// an internal error and does not retry.
pub fn generate_refresh_token() -> Result<String, RefreshTokenError> {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| RefreshTokenError::Generation(e.to_string()))?;

    Ok(hex::encode(bytes))
}

/// Refresh token state machine over the auth store
#[derive(Clone)]
pub struct RefreshTokenStore {
    store: Arc<dyn AuthStore>,
}

impl RefreshTokenStore {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    /// Persist `token` for `user_id`, expiring `ttl` from now
    pub async fn create(
        &self,
        token: &str,
        user_id: Uuid,
        ttl: Duration,
    ) -> Result<(), RefreshTokenError> {
        let expires_at = Utc::now()
            .checked_add_signed(ttl)
            .ok_or(RefreshTokenError::LifetimeOutOfRange(ttl))?;
        self.store
            .create_refresh_token(token, user_id, expires_at)
            .await?;

        tracing::debug!(user_id = %user_id, expires_at = %expires_at, "Refresh token stored");
        Ok(())
    }

    /// Resolve `token` to its owner
    ///
    /// Checks run in order: existence, revocation, then expiry. The
    /// record is not modified.
    pub async fn redeem(&self, token: &str) -> Result<Uuid, RefreshTokenError> {
        let record = self
            .store
            .get_user_from_refresh_token(token)
            .await?
            .ok_or(RefreshTokenError::NotFound)?;

        if record.is_revoked() {
            return Err(RefreshTokenError::Revoked);
        }

        if record.is_expired_at(Utc::now()) {
            return Err(RefreshTokenError::Expired);
        }

        Ok(record.user_id)
    }

    /// Mark `token` revoked; revoking an already revoked token re-stamps it
    pub async fn revoke(&self, token: &str) -> Result<(), RefreshTokenError> {
        if !self.store.set_refresh_token_revoked(token).await? {
            return Err(RefreshTokenError::NotFound);
        }

        Ok(())
    }
}
