/// Password hashing and verification using Argon2id
///
/// Hashes are PHC strings carrying algorithm, parameters and a random
/// 16-byte salt, so verification needs nothing but the stored string.
/// Default cost follows OWASP guidance:
/// - Memory: 64 MB
/// - Iterations: 3
/// - Parallelism: 4 threads
/// - Output: 32 bytes hash
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    /// Wrong password or unparseable hash; deliberately one variant
    #[error("Password does not match")]
    Mismatch,
}

/// Argon2 cost parameters
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Memory cost in KB (default: 65536 = 64 MB)
    pub memory_cost: u32,
    /// Time cost (iterations, default: 3)
    pub time_cost: u32,
    /// Parallelism (threads, default: 4)
    pub parallelism: u32,
    /// Output length in bytes (default: 32)
    pub output_len: Option<usize>,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_cost: 65536, // 64 MB
            time_cost: 3,
            parallelism: 4,
            output_len: Some(32),
        }
    }
}

impl PasswordConfig {
    /// Cheap parameters for tests; never use in production
    pub fn fast_insecure() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
            output_len: Some(32),
        }
    }

    fn to_params(&self) -> Result<Params, PasswordError> {
        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            self.output_len,
        )
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }
}

/// Hash a plaintext password using Argon2id with the default cost
///
/// # Example
///
/// ```no_run
/// use chirpy_api::auth::password::hash_password;
///
/// let hash = hash_password("04234").expect("Failed to hash password");
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    hash_password_with_config(password, &PasswordConfig::default())
}

/// Hash a password with custom configuration
pub fn hash_password_with_config(
    password: &str,
    config: &PasswordConfig,
) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = config.to_params()?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against a stored hash
///
/// Salt and cost are read from `hash`; the digest comparison is
/// constant-time. A malformed hash and a wrong password both return
/// `PasswordError::Mismatch`.
///
/// # Example
///
/// ```no_run
/// use chirpy_api::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("04234").unwrap();
/// assert!(verify_password("04234", &hash).is_ok());
/// assert!(verify_password("wrong", &hash).is_err());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::Mismatch)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| PasswordError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hash(password: &str) -> String {
        hash_password_with_config(password, &PasswordConfig::fast_insecure()).unwrap()
    }

    #[test]
    fn test_hash_and_verify_password() {
        let password = "Omar@123456";
        let hash = hash_password(password).expect("Failed to hash password");

        assert!(verify_password(password, &hash).is_ok());
        assert!(matches!(
            verify_password("WrongPassword", &hash),
            Err(PasswordError::Mismatch)
        ));
    }

    #[test]
    fn test_hash_is_not_plaintext() {
        let hash = fast_hash("Ahmad");
        assert!(!hash.contains("Ahmad"));
        assert!(hash.starts_with("$argon2id$"));
    }

    #[test]
    fn test_empty_password_round_trips() {
        let hash = fast_hash("");
        assert!(verify_password("", &hash).is_ok());
        assert!(verify_password(" ", &hash).is_err());
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let password = "SamePassword123!";

        let hash1 = fast_hash(password);
        let hash2 = fast_hash(password);

        assert_ne!(hash1, hash2);
        assert!(verify_password(password, &hash1).is_ok());
        assert!(verify_password(password, &hash2).is_ok());
    }

    #[test]
    fn test_malformed_hash_is_mismatch() {
        assert!(matches!(
            verify_password("password", "invalid-hash-format"),
            Err(PasswordError::Mismatch)
        ));
        assert!(matches!(
            verify_password("password", ""),
            Err(PasswordError::Mismatch)
        ));
    }

    #[test]
    fn test_custom_config_is_embedded() {
        let config = PasswordConfig {
            memory_cost: 32768,
            time_cost: 2,
            parallelism: 2,
            output_len: Some(32),
        };

        let password = "TestPassword123!";
        let hash = hash_password_with_config(password, &config).unwrap();

        assert!(verify_password(password, &hash).is_ok());
        assert!(hash.contains("m=32768"));
        assert!(hash.contains("t=2"));
        assert!(hash.contains("p=2"));
    }

    #[test]
    fn test_invalid_params_fail_hashing() {
        let config = PasswordConfig {
            memory_cost: 1,
            ..PasswordConfig::fast_insecure()
        };

        assert!(matches!(
            hash_password_with_config("x", &config),
            Err(PasswordError::HashingFailed(_))
        ));
    }
}
