//! Chirpy Configuration Management
//!
//! Handles configuration from environment variables and TOML files
//! with sensible defaults for development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default lifetime of a session (access) token: one hour
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 3600;

/// Default lifetime of a refresh token: sixty hours
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 60 * 3600;

/// Upper bound for either token lifetime: ten years
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 3600;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Database connection
    pub database: DatabaseConfig,

    /// Token signing and webhook credentials
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Deployment platform ("dev" unlocks the admin reset endpoint)
    pub platform: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
            platform: "prod".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Server
        if let Ok(host) = std::env::var("API_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("API_PORT") {
            config.server.port = parse_var("API_PORT", port)?;
        }

        // PostgreSQL
        if let Ok(url) = std::env::var("DB_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            config.database.url = url;
        }
        if let Ok(size) = std::env::var("DB_POOL_SIZE") {
            config.database.pool_size = parse_var("DB_POOL_SIZE", size)?;
        }

        // Auth
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            config.auth.jwt_secret = secret;
        }
        if let Ok(key) = std::env::var("POLKA_KEY") {
            config.auth.polka_key = key;
        }
        if let Ok(ttl) = std::env::var("ACCESS_TOKEN_TTL_SECS") {
            config.auth.access_token_ttl_secs = parse_var("ACCESS_TOKEN_TTL_SECS", ttl)?;
        }
        if let Ok(ttl) = std::env::var("REFRESH_TOKEN_TTL_SECS") {
            config.auth.refresh_token_ttl_secs = parse_var("REFRESH_TOKEN_TTL_SECS", ttl)?;
        }

        if let Ok(platform) = std::env::var("PLATFORM") {
            config.platform = platform;
        }

        // Logging
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = std::env::var("LOG_JSON") {
            config.logging.json_format = parse_var("LOG_JSON", json)?;
        }

        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    ///
    /// Every variable `from_env` reads overrides the file value when set.
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        let env_config = Self::from_env()?;
        let is_set = |key: &str| std::env::var_os(key).is_some();

        if is_set("API_HOST") {
            self.server.host = env_config.server.host;
        }
        if is_set("API_PORT") {
            self.server.port = env_config.server.port;
        }
        if is_set("DB_URL") || is_set("DATABASE_URL") {
            self.database.url = env_config.database.url;
        }
        if is_set("DB_POOL_SIZE") {
            self.database.pool_size = env_config.database.pool_size;
        }
        if is_set("ACCESS_TOKEN_TTL_SECS") {
            self.auth.access_token_ttl_secs = env_config.auth.access_token_ttl_secs;
        }
        if is_set("REFRESH_TOKEN_TTL_SECS") {
            self.auth.refresh_token_ttl_secs = env_config.auth.refresh_token_ttl_secs;
        }
        if is_set("PLATFORM") {
            self.platform = env_config.platform;
        }
        if is_set("LOG_LEVEL") {
            self.logging.level = env_config.logging.level;
        }
        if is_set("LOG_JSON") {
            self.logging.json_format = env_config.logging.json_format;
        }

        // Empty secrets in the environment never blank out the file
        if !env_config.auth.jwt_secret.is_empty() {
            self.auth.jwt_secret = env_config.auth.jwt_secret;
        }
        if !env_config.auth.polka_key.is_empty() {
            self.auth.polka_key = env_config.auth.polka_key;
        }

        Ok(self)
    }

    /// Check invariants the server relies on at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        validate_ttl("ACCESS_TOKEN_TTL_SECS", self.auth.access_token_ttl_secs)?;
        validate_ttl("REFRESH_TOKEN_TTL_SECS", self.auth.refresh_token_ttl_secs)?;
        Ok(())
    }

    /// Whether development-only endpoints are enabled
    pub fn is_dev(&self) -> bool {
        self.platform == "dev"
    }
}

fn validate_ttl(key: &str, secs: i64) -> Result<(), ConfigError> {
    if secs <= 0 || secs > MAX_TOKEN_TTL_SECS {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: secs.to_string(),
        });
    }
    Ok(())
}

fn parse_var<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL (empty selects the in-memory store)
    pub url: String,

    /// PostgreSQL connection pool size
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            pool_size: 5,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for session tokens
    pub jwt_secret: String,

    /// API key the payment provider presents on webhook calls
    pub polka_key: String,

    /// Session token lifetime in seconds
    pub access_token_ttl_secs: i64,

    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            polka_key: String::new(),
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
        }
    }
}

// Secrets stay out of logs
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("polka_key", &"<redacted>")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
