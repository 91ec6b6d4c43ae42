//! Session manager
//!
//! Ties password verification, session token signing and the refresh
//! token store together into the login / refresh / revoke / authenticate
//! flows. Every credential failure reaches the caller as the same
//! `SessionError::AuthenticationFailed`; the precise cause goes to the
//! audit log only.

use axum::http::HeaderMap;
use chirpy_core::{AuthConfig, AuthStore, StoreError, UserRecord};
use chrono::Duration;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use super::headers::{extract_bearer, HeaderError};
use super::jwt::{generate_access_token, validate_access_token, AuthSecret, JwtError};
use super::password::{hash_password_with_config, verify_password, PasswordConfig, PasswordError};
use super::refresh::{generate_refresh_token, RefreshTokenError, RefreshTokenStore};
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};

/// Plaintext hashed once to produce the decoy used for unknown emails
const DECOY_PASSWORD: &str = "chirpy-decoy-password";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Email already registered")]
    EmailTaken,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PasswordError> for SessionError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::Mismatch => SessionError::AuthenticationFailed,
            PasswordError::HashingFailed(e) => SessionError::Internal(e),
        }
    }
}

impl From<JwtError> for SessionError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidToken { .. } => SessionError::AuthenticationFailed,
            JwtError::Encoding(e) => SessionError::Internal(e.to_string()),
        }
    }
}

impl From<RefreshTokenError> for SessionError {
    fn from(err: RefreshTokenError) -> Self {
        match err {
            RefreshTokenError::NotFound
            | RefreshTokenError::Expired
            | RefreshTokenError::Revoked => SessionError::AuthenticationFailed,
            RefreshTokenError::Generation(e) => SessionError::Internal(e),
            RefreshTokenError::LifetimeOutOfRange(ttl) => {
                SessionError::Internal(format!("refresh token lifetime out of range: {ttl}"))
            }
            RefreshTokenError::Storage(e) => SessionError::Internal(e.to_string()),
        }
    }
}

impl From<HeaderError> for SessionError {
    fn from(_: HeaderError) -> Self {
        SessionError::AuthenticationFailed
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => SessionError::EmailTaken,
            // The token subject no longer exists
            StoreError::UserNotFound => SessionError::AuthenticationFailed,
            StoreError::Database(e) => SessionError::Internal(e),
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub user: UserRecord,
    pub access_token: String,
    pub refresh_token: String,
}

/// Login, refresh, revoke and authenticate over one auth store
pub struct SessionManager {
    store: Arc<dyn AuthStore>,
    refresh_tokens: RefreshTokenStore,
    secret: AuthSecret,
    access_ttl: Duration,
    refresh_ttl: Duration,
    password_config: PasswordConfig,
    decoy_hash: OnceCell<String>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn AuthStore>,
        secret: AuthSecret,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            refresh_tokens: RefreshTokenStore::new(store.clone()),
            store,
            secret,
            access_ttl,
            refresh_ttl,
            password_config: PasswordConfig::default(),
            decoy_hash: OnceCell::new(),
        }
    }

    /// Build from the `[auth]` configuration section
    ///
    /// Fails with `InvalidInput` when a lifetime does not fit a `Duration`.
    pub fn from_config(
        store: Arc<dyn AuthStore>,
        config: &AuthConfig,
    ) -> Result<Self, SessionError> {
        Ok(Self::new(
            store,
            AuthSecret::new(config.jwt_secret.clone()),
            ttl_from_secs("access_token_ttl_secs", config.access_token_ttl_secs)?,
            ttl_from_secs("refresh_token_ttl_secs", config.refresh_token_ttl_secs)?,
        ))
    }

    /// Replace the Argon2 cost used for new hashes
    pub fn with_password_config(mut self, config: PasswordConfig) -> Self {
        self.password_config = config;
        self
    }

    /// Verify credentials and issue a session token plus a refresh token
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession, SessionError> {
        let Some(user) = self.store.get_user_by_email(email).await? else {
            self.burn_decoy_verification(password);
            audit_log(&AuditEvent::LoginFailure {
                email: email.to_string(),
                reason: "unknown email".to_string(),
            });
            return Err(SessionError::AuthenticationFailed);
        };

        if let Err(e) = verify_password(password, &user.hashed_password) {
            audit_log(&AuditEvent::LoginFailure {
                email: email.to_string(),
                reason: e.to_string(),
            });
            return Err(e.into());
        }

        let access_token = generate_access_token(&self.secret, user.id, self.access_ttl)?;
        let refresh_token = generate_refresh_token()?;
        self.refresh_tokens
            .create(&refresh_token, user.id, self.refresh_ttl)
            .await?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            email: user.email.clone(),
        });

        Ok(LoginSession {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Mint a new session token from the bearer refresh token
    ///
    /// The refresh token itself is left untouched and stays usable.
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<String, SessionError> {
        let token = extract_bearer(headers).map_err(|e| self.reject(headers, e))?;
        let user_id = self
            .refresh_tokens
            .redeem(&token)
            .await
            .map_err(|e| self.reject(headers, e))?;

        let access_token = generate_access_token(&self.secret, user_id, self.access_ttl)?;

        audit_log(&AuditEvent::TokenRefresh {
            user_id,
            ip_address: extract_ip_address(headers),
        });

        Ok(access_token)
    }

    /// Revoke the bearer refresh token
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), SessionError> {
        let token = extract_bearer(headers).map_err(|e| self.reject(headers, e))?;
        self.refresh_tokens
            .revoke(&token)
            .await
            .map_err(|e| self.reject(headers, e))?;

        audit_log(&AuditEvent::TokenRevoked {
            ip_address: extract_ip_address(headers),
        });

        Ok(())
    }

    /// Resolve the bearer session token to its user id
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, SessionError> {
        let token = extract_bearer(headers).map_err(|e| self.reject(headers, e))?;
        validate_access_token(&self.secret, &token).map_err(|e| self.reject(headers, e))
    }

    /// Create a user with a freshly hashed password
    pub async fn register(&self, email: &str, password: &str) -> Result<UserRecord, SessionError> {
        if let Err(e) = validate_email(email) {
            audit_log(&AuditEvent::RegistrationFailure {
                email: email.to_string(),
                reason: e.to_string(),
            });
            return Err(e);
        }

        let hashed = hash_password_with_config(password, &self.password_config)?;
        let user = self.store.create_user(email, &hashed).await.map_err(|e| {
            audit_log(&AuditEvent::RegistrationFailure {
                email: email.to_string(),
                reason: e.to_string(),
            });
            SessionError::from(e)
        })?;

        audit_log(&AuditEvent::RegistrationSuccess {
            user_id: user.id,
            email: user.email.clone(),
        });

        Ok(user)
    }

    /// Replace the email and password of an authenticated user
    pub async fn update_credentials(
        &self,
        user_id: Uuid,
        email: &str,
        password: &str,
    ) -> Result<UserRecord, SessionError> {
        validate_email(email)?;

        let hashed = hash_password_with_config(password, &self.password_config)?;
        let user = self.store.update_user(user_id, email, &hashed).await?;

        audit_log(&AuditEvent::CredentialsUpdated {
            user_id: user.id,
            email: user.email.clone(),
        });

        Ok(user)
    }

    /// Spend one Argon2 verification so unknown emails cost the same as
    /// wrong passwords
    fn burn_decoy_verification(&self, password: &str) {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| hash_password_with_config(DECOY_PASSWORD, &self.password_config));

        match decoy {
            Ok(hash) => {
                let _ = verify_password(password, hash);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to compute decoy password hash"),
        }
    }

    fn reject(&self, headers: &HeaderMap, cause: impl Into<SessionError> + ToString) -> SessionError {
        audit_log(&AuditEvent::InvalidToken {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
            reason: cause.to_string(),
        });
        cause.into()
    }
}

fn validate_email(email: &str) -> Result<(), SessionError> {
    if email.trim().is_empty() {
        return Err(SessionError::InvalidInput("email is required".to_string()));
    }
    if !email.contains('@') {
        return Err(SessionError::InvalidInput("invalid email format".to_string()));
    }
    Ok(())
}

fn ttl_from_secs(name: &str, secs: i64) -> Result<Duration, SessionError> {
    Duration::try_seconds(secs)
        .ok_or_else(|| SessionError::InvalidInput(format!("{name} out of range: {secs}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};
    use chirpy_core::MemoryAuthStore;

    fn manager() -> SessionManager {
        manager_with_ttls(Duration::hours(1), Duration::hours(60))
    }

    fn manager_with_ttls(access: Duration, refresh: Duration) -> SessionManager {
        SessionManager::new(
            Arc::new(MemoryAuthStore::new()),
            AuthSecret::new("test-secret"),
            access,
            refresh,
        )
        .with_password_config(PasswordConfig::fast_insecure())
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_login_issues_both_tokens() {
        let sessions = manager();
        let user = sessions.register("walt@example.com", "04234").await.unwrap();

        let session = sessions.login("walt@example.com", "04234").await.unwrap();

        assert_eq!(session.user.id, user.id);
        assert_eq!(session.refresh_token.len(), 64);
        assert_eq!(
            sessions.authenticate(&bearer(&session.access_token)).unwrap(),
            user.id
        );
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_alike() {
        let sessions = manager();
        sessions.register("walt@example.com", "04234").await.unwrap();

        let wrong_password = sessions.login("walt@example.com", "nope").await;
        let unknown_email = sessions.login("jesse@example.com", "04234").await;

        assert!(matches!(wrong_password, Err(SessionError::AuthenticationFailed)));
        assert!(matches!(unknown_email, Err(SessionError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_refresh_does_not_rotate() {
        let sessions = manager();
        let user = sessions.register("walt@example.com", "04234").await.unwrap();
        let session = sessions.login("walt@example.com", "04234").await.unwrap();
        let headers = bearer(&session.refresh_token);

        let first = sessions.refresh(&headers).await.unwrap();
        let second = sessions.refresh(&headers).await.unwrap();

        assert_eq!(sessions.authenticate(&bearer(&first)).unwrap(), user.id);
        assert_eq!(sessions.authenticate(&bearer(&second)).unwrap(), user.id);
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_cannot_refresh() {
        let sessions = manager();
        sessions.register("walt@example.com", "04234").await.unwrap();
        let session = sessions.login("walt@example.com", "04234").await.unwrap();
        let headers = bearer(&session.refresh_token);

        sessions.revoke(&headers).await.unwrap();

        assert!(matches!(
            sessions.refresh(&headers).await,
            Err(SessionError::AuthenticationFailed)
        ));
        // Revoking again only re-stamps
        sessions.revoke(&headers).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_refresh_token_cannot_refresh() {
        let sessions = manager_with_ttls(Duration::hours(1), Duration::seconds(-1));
        sessions.register("walt@example.com", "04234").await.unwrap();
        let session = sessions.login("walt@example.com", "04234").await.unwrap();

        assert!(matches!(
            sessions.refresh(&bearer(&session.refresh_token)).await,
            Err(SessionError::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn test_header_failures_fold_into_authentication_failed() {
        let sessions = manager();

        assert!(matches!(
            sessions.authenticate(&HeaderMap::new()),
            Err(SessionError::AuthenticationFailed)
        ));
        assert!(matches!(
            sessions.refresh(&HeaderMap::new()).await,
            Err(SessionError::AuthenticationFailed)
        ));
        assert!(matches!(
            sessions.revoke(&bearer("unknown")).await,
            Err(SessionError::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn test_token_from_other_secret_is_rejected() {
        let sessions = manager();
        let token = generate_access_token(
            &AuthSecret::new("other-secret"),
            Uuid::new_v4(),
            Duration::hours(1),
        )
        .unwrap();

        assert!(matches!(
            sessions.authenticate(&bearer(&token)),
            Err(SessionError::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let sessions = manager();

        assert!(matches!(
            sessions.register("", "pw").await,
            Err(SessionError::InvalidInput(_))
        ));
        assert!(matches!(
            sessions.register("not-an-email", "pw").await,
            Err(SessionError::InvalidInput(_))
        ));

        sessions.register("walt@example.com", "pw").await.unwrap();
        assert!(matches!(
            sessions.register("walt@example.com", "pw").await,
            Err(SessionError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn test_update_credentials() {
        let sessions = manager();
        let user = sessions.register("walt@example.com", "04234").await.unwrap();

        let updated = sessions
            .update_credentials(user.id, "heisenberg@example.com", "blue")
            .await
            .unwrap();
        assert_eq!(updated.email, "heisenberg@example.com");

        assert!(sessions.login("walt@example.com", "04234").await.is_err());
        assert!(sessions.login("heisenberg@example.com", "blue").await.is_ok());

        assert!(matches!(
            sessions
                .update_credentials(Uuid::new_v4(), "x@example.com", "pw")
                .await,
            Err(SessionError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_from_config_rejects_unrepresentable_ttl() {
        let config = AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_ttl_secs: i64::MAX,
            ..Default::default()
        };

        let result = SessionManager::from_config(Arc::new(MemoryAuthStore::new()), &config);
        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_login_with_overflowing_refresh_ttl_is_internal_error() {
        let sessions =
            manager_with_ttls(Duration::hours(1), Duration::seconds(10_000_000_000_000));
        sessions.register("walt@example.com", "04234").await.unwrap();

        assert!(matches!(
            sessions.login("walt@example.com", "04234").await,
            Err(SessionError::Internal(_))
        ));
    }
}
