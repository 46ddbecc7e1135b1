//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Guard the read and delete routes with a bearer token.
//! - Inject shared application state (`AppState`) into handlers.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
