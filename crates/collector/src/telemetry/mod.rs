//! Tracing setup: structured JSON logs, plus OTLP span export when configured.
//!
//! # Telemetry invariants
//!
//! - **No PII, ciphertext, lookup tokens, bearer tokens or key material** may
//!   appear in any span attribute or log field.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_telemetry;
