//! PostgreSQL auth store
//!
//! Users, refresh tokens and chirps backed by SQLx and PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::store::{
    AuthStore, ChirpRecord, RefreshTokenRecord, StoreError, StoreResult, UserRecord,
};

const USER_COLUMNS: &str = "id, created_at, updated_at, email, hashed_password, is_chirpy_red";
const CHIRP_COLUMNS: &str = "id, created_at, updated_at, body, user_id";

/// PostgreSQL auth store
#[derive(Clone)]
pub struct PgAuthStore {
    pool: PgPool,
}

impl PgAuthStore {
    /// Create a new store connection
    pub async fn new(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;

        tracing::info!("Database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl AuthStore for PgAuthStore {
    async fn create_user(&self, email: &str, hashed_password: &str) -> StoreResult<UserRecord> {
        let query = format!(
            r#"
            INSERT INTO users (id, created_at, updated_at, email, hashed_password)
            VALUES ($1, NOW(), NOW(), $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(hashed_password)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn get_user_by_id(&self, user_id: Uuid) -> StoreResult<Option<UserRecord>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        let user = sqlx::query_as::<_, UserRecord>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn update_user(
        &self,
        user_id: Uuid,
        email: &str,
        hashed_password: &str,
    ) -> StoreResult<UserRecord> {
        let query = format!(
            r#"
            UPDATE users
            SET email = $2, hashed_password = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, UserRecord>(&query)
            .bind(user_id)
            .bind(email)
            .bind(hashed_password)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::UserNotFound)
    }

    async fn upgrade_user_to_chirpy_red(&self, user_id: Uuid) -> StoreResult<UserRecord> {
        let query = format!(
            r#"
            UPDATE users
            SET is_chirpy_red = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, UserRecord>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::UserNotFound)
    }

    async fn delete_all_users(&self) -> StoreResult<()> {
        sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn create_refresh_token(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<RefreshTokenRecord> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            INSERT INTO refresh_tokens (token, user_id, created_at, expires_at, revoked_at)
            VALUES ($1, $2, NOW(), $3, NULL)
            RETURNING token, user_id, created_at, expires_at, revoked_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            // The token primary key, not an email
            StoreError::DuplicateEmail => {
                StoreError::Database("duplicate refresh token value".to_string())
            }
            other => other,
        })?;

        Ok(record)
    }

    async fn get_user_from_refresh_token(
        &self,
        token: &str,
    ) -> StoreResult<Option<RefreshTokenRecord>> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT token, user_id, created_at, expires_at, revoked_at FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn set_refresh_token_revoked(&self, token: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_chirp(&self, body: &str, user_id: Uuid) -> StoreResult<ChirpRecord> {
        let query = format!(
            r#"
            INSERT INTO chirps (id, created_at, updated_at, body, user_id)
            VALUES ($1, NOW(), NOW(), $2, $3)
            RETURNING {CHIRP_COLUMNS}
            "#
        );

        let chirp = sqlx::query_as::<_, ChirpRecord>(&query)
            .bind(Uuid::new_v4())
            .bind(body)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(chirp)
    }

    async fn list_chirps(&self, author_id: Option<Uuid>) -> StoreResult<Vec<ChirpRecord>> {
        let chirps = match author_id {
            Some(author_id) => {
                let query = format!(
                    "SELECT {CHIRP_COLUMNS} FROM chirps WHERE user_id = $1 ORDER BY created_at ASC"
                );
                sqlx::query_as::<_, ChirpRecord>(&query)
                    .bind(author_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query = format!("SELECT {CHIRP_COLUMNS} FROM chirps ORDER BY created_at ASC");
                sqlx::query_as::<_, ChirpRecord>(&query)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(chirps)
    }

    async fn get_chirp(&self, chirp_id: Uuid) -> StoreResult<Option<ChirpRecord>> {
        let query = format!("SELECT {CHIRP_COLUMNS} FROM chirps WHERE id = $1");

        let chirp = sqlx::query_as::<_, ChirpRecord>(&query)
            .bind(chirp_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(chirp)
    }

    async fn delete_chirp(&self, chirp_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM chirps WHERE id = $1")
            .bind(chirp_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
