//! Shared application state injected into every Axum handler.

use std::sync::Arc;
use std::time::Instant;

use pii::KeyMaterial;

use crate::config::Config;
use crate::store::EventStore;

/// Request-path settings taken from [`Config`] at startup.
pub struct Settings {
    /// Bearer token for protected routes; `None` locks them.
    pub password: Option<String>,
    /// Extra secret mixed into client IP hashes.
    pub ip_hash_secret: String,
    pub fetch_default_limit: usize,
    pub fetch_max_limit: usize,
}

impl Settings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            password: cfg.password.clone().filter(|p| !p.is_empty()),
            ip_hash_secret: cfg.ip_hash_secret.clone(),
            fetch_default_limit: cfg.fetch_default_limit,
            fetch_max_limit: cfg.fetch_max_limit,
        }
    }
}

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or `Copy`) so that Axum can
/// clone the state for each request without copying key material.
#[derive(Clone)]
pub struct AppState {
    /// Field encryption and lookup keys, loaded once at startup.
    pub keys: Arc<KeyMaterial>,
    /// Persistence collaborator.
    pub store: Arc<dyn EventStore>,
    pub settings: Arc<Settings>,
    /// Process start, for the health endpoint's uptime.
    pub started_at: Instant,
}

impl AppState {
    /// Create a new [`AppState`].
    pub fn new(keys: KeyMaterial, store: Arc<dyn EventStore>, settings: Settings) -> Self {
        Self {
            keys: Arc::new(keys),
            store,
            settings: Arc::new(settings),
            started_at: Instant::now(),
        }
    }
}
