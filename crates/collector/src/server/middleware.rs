//! Axum middleware layers applied to the router.
//!
//! Includes bearer-token checks for protected routes, the CORS policy, and the
//! request timeout.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
        request::Parts,
        HeaderMap, HeaderValue, Method,
    },
    middleware::Next,
    response::Response,
};
use common::ServiceError;
use regex::Regex;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use super::handlers::error_response;
use super::state::AppState;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long browsers may cache a preflight response.
pub const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

/// Reject requests whose `Authorization` header is not `Bearer <password>`.
///
/// Responds `401` with `WWW-Authenticate: Bearer`. When no password is
/// configured every request is rejected.
pub async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if is_authorized(request.headers(), state.settings.password.as_deref()) {
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "rejected request without valid bearer token");
    let mut resp = error_response(ServiceError::Unauthorized);
    resp.headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    resp
}

fn is_authorized(headers: &HeaderMap, password: Option<&str>) -> bool {
    let Some(password) = password.filter(|p| !p.is_empty()) else {
        return false;
    };
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == password)
}

/// Build the CORS layer.
///
/// With `allow_any` every origin is echoed; otherwise only `http(s)` origins on
/// `domain` or any of its subdomains, with an optional port, are allowed.
///
/// # Errors
///
/// Returns an error if the origin pattern cannot be compiled.
pub fn cors_layer(allow_any: bool, domain: &str) -> Result<CorsLayer, regex::Error> {
    let origin = if allow_any {
        AllowOrigin::any()
    } else {
        let pattern = origin_pattern(domain)?;
        AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
            origin.to_str().is_ok_and(|o| pattern.is_match(o))
        })
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(CORS_MAX_AGE))
}

fn origin_pattern(domain: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?i)^https?://([a-z0-9-]+\.)*{}(:\d+)?$",
        regex::escape(domain.trim())
    ))
}
