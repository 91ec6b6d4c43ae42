//! Storage collaborator for the authentication subsystem
//!
//! Defines the rows the auth layer and the chirp handlers read and write
//! and the `AuthStore` trait implemented by the PostgreSQL and in-memory
//! backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("User not found")]
    UserNotFound,
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => StoreError::DuplicateEmail,
            // Only `user_id` columns carry foreign keys
            Some(db_err) if db_err.is_foreign_key_violation() => StoreError::UserNotFound,
            _ => StoreError::Database(err.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// User account row
///
/// Maps to the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    /// Argon2id PHC string, never serialized in API responses
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub is_chirpy_red: bool,
}

/// Refresh token row
///
/// Maps to the `refresh_tokens` table, keyed by the token value.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokenRecord {
    /// Expired once `expires_at` is at or before `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Check if the token is revoked
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

/// Chirp row
///
/// Maps to the `chirps` table; removed with its author.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChirpRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub body: String,
    pub user_id: Uuid,
}

/// Persistence operations consumed by the auth subsystem
///
/// Implementations are expected to serialize conflicting writes themselves;
/// callers add no locking of their own.
#[async_trait]
pub trait AuthStore: Send + Sync {
    /// Insert a user; a taken email is `StoreError::DuplicateEmail`
    async fn create_user(&self, email: &str, hashed_password: &str) -> StoreResult<UserRecord>;

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    async fn get_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<UserRecord>>;

    /// Replace email and password hash of an existing user
    async fn update_user(
        &self,
        user_id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> StoreResult<UserRecord>;

    /// Set the premium flag; unknown ids are `StoreError::UserNotFound`
    async fn upgrade_user_to_chirpy_red(&self, user_id: Uuid) -> StoreResult<UserRecord>;

    /// Remove every user (refresh tokens and chirps cascade)
    async fn delete_all_users(&self) -> StoreResult<()>;

    /// Store a token for an existing user; unknown ids are `StoreError::UserNotFound`
    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord>;

    async fn get_user_from_refresh_token(
        &self,
        token: &str,
    ) -> StoreResult<Option<RefreshTokenRecord>>;

    /// Stamp `revoked_at = now`; returns `false` when no row matched
    async fn set_refresh_token_revoked(&self, token: &str) -> StoreResult<bool>;

    /// Insert a chirp; unknown authors are `StoreError::UserNotFound`
    async fn create_chirp(&self, body: &str, user_id: Uuid) -> StoreResult<ChirpRecord>;

    /// All chirps, or those of one author, oldest first
    async fn list_chirps(&self, author_id: Option<Uuid>) -> StoreResult<Vec<ChirpRecord>>;

    async fn get_chirp(&self, chirp_id: Uuid) -> StoreResult<Option<ChirpRecord>>;

    /// Returns `false` when no row matched
    async fn delete_chirp(&self, chirp_id: Uuid) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_expiring_at(expires_at: DateTime<Utc>) -> RefreshTokenRecord {
        RefreshTokenRecord {
            token: "ab".repeat(32),
            user_id: Uuid::new_v4(),
            created_at: Utc::now(),
            expires_at,
            revoked_at: None,
        }
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let now = Utc::now();

        assert!(token_expiring_at(now).is_expired_at(now));
        assert!(token_expiring_at(now - Duration::seconds(1)).is_expired_at(now));
        assert!(!token_expiring_at(now + Duration::seconds(1)).is_expired_at(now));
    }

    #[test]
    fn test_user_record_hides_password_hash() {
        let user = UserRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            email: "walt@breakingbad.com".to_string(),
            hashed_password: "$argon2id$v=19$secret".to_string(),
            is_chirpy_red: false,
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("hashed_password"));
        assert!(!json.contains("argon2id"));
    }
}
