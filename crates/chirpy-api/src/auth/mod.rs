//! Authentication and session lifecycle
//!
//! - Password hashing with Argon2
//! - Session token signing and validation (JWT)
//! - Refresh token generation, redemption and revocation
//! - Credential extraction from request headers
//! - The session manager tying them together
//! - Middleware for request authentication

pub mod headers;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod refresh;
pub mod session;

pub use headers::{api_key_matches, extract_api_key, extract_bearer, HeaderError};
pub use jwt::{
    generate_access_token, validate_access_token, AuthSecret, Claims, InvalidTokenReason, JwtError,
};
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use password::{
    hash_password, hash_password_with_config, verify_password, PasswordConfig, PasswordError,
};
pub use refresh::{generate_refresh_token, RefreshTokenError, RefreshTokenStore};
pub use session::{LoginSession, SessionError, SessionManager};
