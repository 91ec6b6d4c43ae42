//! JWT session token generation and validation
//!
//! Session tokens are HMAC-SHA256 signed claim sets carrying the user id
//! and an expiry. They are stateless: validity is signature plus expiry,
//! and nothing is looked up in storage.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Issuer stamped into and required on every session token
pub const TOKEN_ISSUER: &str = "chirpy";

/// Process-wide signing key for session tokens
///
/// Loaded once from configuration and shared read-only. `Debug` never
/// prints the key material.
#[derive(Clone)]
pub struct AuthSecret(String);

impl AuthSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for AuthSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthSecret(<redacted>)")
    }
}

/// Session token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer (always "chirpy")
    pub iss: String,
    /// Subject - user ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issued at timestamp (Unix epoch seconds)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,
}

/// Why a token was rejected; for logs only, never shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTokenReason {
    Malformed,
    BadSignature,
    Expired,
    WrongIssuer,
    MissingSubject,
    InvalidSubject,
}

impl fmt::Display for InvalidTokenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Malformed => "malformed token",
            Self::BadSignature => "signature mismatch",
            Self::Expired => "token expired",
            Self::WrongIssuer => "unexpected issuer",
            Self::MissingSubject => "missing subject claim",
            Self::InvalidSubject => "subject is not a user id",
        };
        f.write_str(reason)
    }
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token: {reason}")]
    InvalidToken { reason: InvalidTokenReason },
}

impl JwtError {
    fn invalid(reason: InvalidTokenReason) -> Self {
        JwtError::InvalidToken { reason }
    }
}

/// Generate a signed session token for `user_id`
///
/// `ttl` may be zero or negative; such a token is issued normally and is
/// rejected by `validate_access_token`.
///
/// # Example
///
/// ```no_run
/// use chirpy_api::auth::jwt::{generate_access_token, AuthSecret};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// let secret = AuthSecret::new("super-secret-key-123!@#");
/// let token = generate_access_token(&secret, Uuid::new_v4(), Duration::hours(1))
///     .expect("Failed to generate token");
/// ```
pub fn generate_access_token(
    secret: &AuthSecret,
    user_id: Uuid,
    ttl: Duration,
) -> Result<String, JwtError> {
    let now = Utc::now().timestamp();

    let claims = Claims {
        iss: TOKEN_ISSUER.to_string(),
        sub: Some(user_id.to_string()),
        iat: now,
        exp: now + ttl.num_seconds(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Validate a session token and return its subject
///
/// Fails with `JwtError::InvalidToken` on a bad signature, a foreign
/// issuer, an `exp` at or before now, or a missing or non-UUID subject.
pub fn validate_access_token(secret: &AuthSecret, token: &str) -> Result<Uuid, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        JwtError::invalid(match e.kind() {
            ErrorKind::ExpiredSignature => InvalidTokenReason::Expired,
            ErrorKind::InvalidSignature => InvalidTokenReason::BadSignature,
            ErrorKind::InvalidIssuer => InvalidTokenReason::WrongIssuer,
            ErrorKind::MissingRequiredClaim(claim) if claim == "sub" => {
                InvalidTokenReason::MissingSubject
            }
            _ => InvalidTokenReason::Malformed,
        })
    })?;

    let claims = token_data.claims;

    // The library still accepts exp == now with zero leeway
    if claims.exp <= Utc::now().timestamp() {
        return Err(JwtError::invalid(InvalidTokenReason::Expired));
    }

    let sub = claims
        .sub
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| JwtError::invalid(InvalidTokenReason::MissingSubject))?;

    Uuid::parse_str(&sub).map_err(|_| JwtError::invalid(InvalidTokenReason::InvalidSubject))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sign_raw(secret: &str, claims: &serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn reason(result: Result<Uuid, JwtError>) -> InvalidTokenReason {
        match result {
            Err(JwtError::InvalidToken { reason }) => reason,
            other => panic!("expected InvalidToken, got {other:?}"),
        }
    }

    #[test]
    fn test_generate_and_validate_token() {
        let secret = AuthSecret::new("super-secret-key-123!@#");
        let user_id = Uuid::parse_str("b3a29e2e-54e4-4b84-a991-07b5f63c2a6a").unwrap();

        let token = generate_access_token(&secret, user_id, Duration::minutes(15))
            .expect("Failed to generate token");

        let subject = validate_access_token(&secret, &token).expect("Failed to validate token");
        assert_eq!(subject, user_id);
    }

    #[test]
    fn test_invalid_token() {
        let secret = AuthSecret::new("secret");
        let result = validate_access_token(&secret, "invalid.token.here");
        assert_eq!(reason(result), InvalidTokenReason::Malformed);
    }

    #[test]
    fn test_wrong_secret() {
        let token = generate_access_token(
            &AuthSecret::new("secret1"),
            Uuid::new_v4(),
            Duration::minutes(15),
        )
        .unwrap();

        let result = validate_access_token(&AuthSecret::new("secret2"), &token);
        assert_eq!(reason(result), InvalidTokenReason::BadSignature);
    }

    #[test]
    fn test_expired_at_issuance() {
        let secret = AuthSecret::new("another-secret-key-456$%^");
        let token = generate_access_token(&secret, Uuid::new_v4(), Duration::minutes(-10))
            .expect("negative ttl is accepted at issuance");

        let result = validate_access_token(&secret, &token);
        assert_eq!(reason(result), InvalidTokenReason::Expired);
    }

    #[test]
    fn test_zero_ttl_is_rejected() {
        let secret = AuthSecret::new("secret");
        let token = generate_access_token(&secret, Uuid::new_v4(), Duration::zero()).unwrap();

        let result = validate_access_token(&secret, &token);
        assert_eq!(reason(result), InvalidTokenReason::Expired);
    }

    #[test]
    fn test_missing_subject() {
        let now = Utc::now().timestamp();
        let token = sign_raw(
            "secret",
            &json!({ "iss": TOKEN_ISSUER, "iat": now, "exp": now + 600 }),
        );

        let result = validate_access_token(&AuthSecret::new("secret"), &token);
        assert_eq!(reason(result), InvalidTokenReason::MissingSubject);
    }

    #[test]
    fn test_empty_subject() {
        let now = Utc::now().timestamp();
        let token = sign_raw(
            "secret",
            &json!({ "iss": TOKEN_ISSUER, "sub": "", "iat": now, "exp": now + 600 }),
        );

        let result = validate_access_token(&AuthSecret::new("secret"), &token);
        assert_eq!(reason(result), InvalidTokenReason::MissingSubject);
    }

    #[test]
    fn test_non_uuid_subject() {
        let now = Utc::now().timestamp();
        let token = sign_raw(
            "secret",
            &json!({ "iss": TOKEN_ISSUER, "sub": "walter", "iat": now, "exp": now + 600 }),
        );

        let result = validate_access_token(&AuthSecret::new("secret"), &token);
        assert_eq!(reason(result), InvalidTokenReason::InvalidSubject);
    }

    #[test]
    fn test_foreign_issuer() {
        let now = Utc::now().timestamp();
        let token = sign_raw(
            "secret",
            &json!({
                "iss": "not-chirpy",
                "sub": Uuid::new_v4().to_string(),
                "iat": now,
                "exp": now + 600,
            }),
        );

        let result = validate_access_token(&AuthSecret::new("secret"), &token);
        assert_eq!(reason(result), InvalidTokenReason::WrongIssuer);
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = AuthSecret::new("hunter2");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }
}
