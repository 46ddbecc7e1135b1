//! Common error types shared across crates.

use thiserror::Error;

use crate::protocol::ErrorResponse;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::MissingFields`], [`ServiceError::InvalidId`] → 400
/// - [`ServiceError::Unauthorized`] → 401
/// - [`ServiceError::NotFound`] → 404
/// - [`ServiceError::EncryptionFailure`], [`ServiceError::Storage`] → 500
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Required request fields are absent or blank.
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// The event id is missing or not a valid id.
    #[error("invalid or missing id")]
    InvalidId,

    /// The bearer token is missing or does not match.
    #[error("unauthorized")]
    Unauthorized,

    /// No route matches the request.
    #[error("not found")]
    NotFound,

    /// A field could not be protected; nothing was stored.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),

    /// The persistence layer rejected the operation.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::MissingFields(_) | ServiceError::InvalidId => 400,
            ServiceError::Unauthorized => 401,
            ServiceError::NotFound => 404,
            ServiceError::EncryptionFailure(_) | ServiceError::Storage(_) => 500,
        }
    }

    /// Short machine-readable code sent in the `error` member.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::MissingFields(_) => "missing_fields",
            ServiceError::InvalidId => "invalid_or_missing_id",
            ServiceError::Unauthorized => "unauthorized",
            ServiceError::NotFound => "not_found",
            ServiceError::EncryptionFailure(_) | ServiceError::Storage(_) => "server_error",
        }
    }

    /// Body safe to expose to callers. Server-side details are never included.
    pub fn to_body(&self) -> ErrorResponse {
        match self {
            ServiceError::MissingFields(need) => ErrorResponse::missing(need.clone()),
            _ => ErrorResponse::new(self.code()),
        }
    }
}
