//! In-memory auth store
//!
//! Used by tests and by the server when no database URL is configured.
//! Mirrors the PostgreSQL semantics: unique emails, rows that must point at
//! an existing user, cascading token and chirp delete on user removal, and
//! `revoked_at` re-stamped on every revoke.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{
    AuthStore, ChirpRecord, RefreshTokenRecord, StoreError, StoreResult, UserRecord,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    refresh_tokens: HashMap<String, RefreshTokenRecord>,
    /// Insertion order is creation order
    chirps: Vec<ChirpRecord>,
}

/// In-memory auth store
#[derive(Default)]
pub struct MemoryAuthStore {
    tables: RwLock<Tables>,
}

impl MemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored refresh tokens, including expired and revoked ones
    pub async fn refresh_token_count(&self) -> usize {
        self.tables.read().await.refresh_tokens.len()
    }
}

#[async_trait]
impl AuthStore for MemoryAuthStore {
    async fn create_user(&self, email: &str, hashed_password: &str) -> StoreResult<UserRecord> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(StoreError::DuplicateEmail);
        }

        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            is_chirpy_red: false,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn update_user(
        &self,
        user_id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> StoreResult<UserRecord> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.email == email && u.id != user_id)
        {
            return Err(StoreError::DuplicateEmail);
        }

        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserNotFound)?;
        user.email = email.to_string();
        user.hashed_password = hashed_password.to_string();
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn upgrade_user_to_chirpy_red(&self, user_id: Uuid) -> StoreResult<UserRecord> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or(StoreError::UserNotFound)?;
        user.is_chirpy_red = true;
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn delete_all_users(&self) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.users.clear();
        tables.refresh_tokens.clear();
        tables.chirps.clear();
        Ok(())
    }

    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::UserNotFound);
        }
        if tables.refresh_tokens.contains_key(token) {
            return Err(StoreError::Database(
                "duplicate refresh token value".to_string(),
            ));
        }

        let record = RefreshTokenRecord {
            token: token.to_string(),
            user_id,
            created_at: Utc::now(),
            expires_at,
            revoked_at: None,
        };
        tables
            .refresh_tokens
            .insert(record.token.clone(), record.clone());

        Ok(record)
    }

    async fn get_user_from_refresh_token(
        &self,
        token: &str,
    ) -> StoreResult<Option<RefreshTokenRecord>> {
        Ok(self.tables.read().await.refresh_tokens.get(token).cloned())
    }

    async fn set_refresh_token_revoked(&self, token: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.refresh_tokens.get_mut(token) {
            Some(record) => {
                record.revoked_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_chirp(&self, body: &str, user_id: Uuid) -> StoreResult<ChirpRecord> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user_id) {
            return Err(StoreError::UserNotFound);
        }

        let now = Utc::now();
        let chirp = ChirpRecord {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            body: body.to_string(),
            user_id,
        };
        tables.chirps.push(chirp.clone());

        Ok(chirp)
    }

    async fn list_chirps(&self, author_id: Option<Uuid>) -> StoreResult<Vec<ChirpRecord>> {
        let tables = self.tables.read().await;
        let chirps = tables
            .chirps
            .iter()
            .filter(|c| author_id.map_or(true, |id| c.user_id == id))
            .cloned()
            .collect();

        Ok(chirps)
    }

    async fn get_chirp(&self, chirp_id: Uuid) -> StoreResult<Option<ChirpRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.chirps.iter().find(|c| c.id == chirp_id).cloned())
    }

    async fn delete_chirp(&self, chirp_id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.chirps.len();
        tables.chirps.retain(|c| c.id != chirp_id);
        Ok(tables.chirps.len() < before)
    }
}
