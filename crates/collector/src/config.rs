//! Configuration loading and validation for the collector service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use pii::{ConfigError, KeyMaterial};
use serde::Deserialize;

/// Validated collector configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Base64 32-byte AES-256-GCM key for contact fields. **Required.**
    pub piifield_key: Option<String>,

    /// Base64 32-byte HMAC-SHA-256 key for lookup tokens. **Required.**
    pub pii_hmac_key: Option<String>,

    /// Bearer token guarding the read and delete routes. When unset those
    /// routes reject every request.
    pub password: Option<String>,

    /// Extra secret mixed into the daily client IP hash.
    #[serde(default)]
    pub ip_hash_secret: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP collector endpoint. Span export is disabled when unset.
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Accept requests from any origin.
    #[serde(default)]
    pub disable_cors: bool,

    /// Apex domain whose origins (any subdomain, optional port) are allowed.
    #[serde(default = "default_cors_allowed_domain")]
    pub cors_allowed_domain: String,

    /// Events returned by `GET /api/fetch` when no limit is given.
    #[serde(default = "default_fetch_limit")]
    pub fetch_default_limit: usize,

    /// Upper bound on the `GET /api/fetch` limit.
    #[serde(default = "default_fetch_max_limit")]
    pub fetch_max_limit: usize,
}

fn default_port() -> u16 {
    3000
}
fn default_log_level() -> String {
    "info".into()
}
fn default_cors_allowed_domain() -> String {
    "tenantact.org".into()
}
fn default_fetch_limit() -> usize {
    10
}
fn default_fetch_max_limit() -> usize {
    100
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Decode and validate both PII keys.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if either key is missing, not base64, or not
    /// exactly 32 bytes.
    pub fn key_material(&self) -> Result<KeyMaterial, ConfigError> {
        KeyMaterial::load(self.piifield_key.as_deref(), self.pii_hmac_key.as_deref())
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.cors_allowed_domain, "CORS_ALLOWED_DOMAIN")?;

        if self.port == 0 {
            anyhow::bail!("PORT must be > 0");
        }
        if self.fetch_default_limit == 0 {
            anyhow::bail!("FETCH_DEFAULT_LIMIT must be > 0");
        }
        if self.fetch_default_limit > self.fetch_max_limit {
            anyhow::bail!("FETCH_DEFAULT_LIMIT must not exceed FETCH_MAX_LIMIT");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redact(v: &Option<String>) -> &'static str {
            if v.is_some() {
                "[REDACTED]"
            } else {
                "<unset>"
            }
        }
        f.debug_struct("Config")
            .field("piifield_key", &redact(&self.piifield_key))
            .field("pii_hmac_key", &redact(&self.pii_hmac_key))
            .field("password", &redact(&self.password))
            .field("ip_hash_secret", &"[REDACTED]")
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("disable_cors", &self.disable_cors)
            .field("cors_allowed_domain", &self.cors_allowed_domain)
            .field("fetch_default_limit", &self.fetch_default_limit)
            .field("fetch_max_limit", &self.fetch_max_limit)
            .finish()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
