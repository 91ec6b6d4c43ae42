//! Chirpy Core - configuration and storage
//!
//! This crate defines the pieces shared by the Chirpy binaries:
//! - Configuration management
//! - The `AuthStore` storage trait and its row types
//! - PostgreSQL and in-memory store implementations

pub mod config;
pub mod memory;
pub mod postgres;
pub mod store;

pub use config::{AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig};
pub use memory::MemoryAuthStore;
pub use postgres::PgAuthStore;
pub use store::{AuthStore, ChirpRecord, RefreshTokenRecord, StoreError, StoreResult, UserRecord};
