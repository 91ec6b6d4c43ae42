//! Application state management

use crate::auth::{SessionError, SessionManager};
use chirpy_core::{AppConfig, AuthStore};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// User and refresh token storage
    pub store: Arc<dyn AuthStore>,
    /// Login, refresh, revoke and authenticate
    pub sessions: SessionManager,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create state with a session manager built from `config.auth`
    pub fn new(config: AppConfig, store: Arc<dyn AuthStore>) -> Result<Self, SessionError> {
        let sessions = SessionManager::from_config(store.clone(), &config.auth)?;
        Ok(Self::with_sessions(config, store, sessions))
    }

    /// Create state around an already configured session manager
    pub fn with_sessions(
        config: AppConfig,
        store: Arc<dyn AuthStore>,
        sessions: SessionManager,
    ) -> Self {
        Self {
            config,
            store,
            sessions,
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
