//! Request and response types exchanged with collector clients.
//!
//! Member names follow the stored document shape (`campaignId`,
//! `contactDeets`, `email_hash`, ...) so clients see one vocabulary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Generic responses
// ---------------------------------------------------------------------------

/// `{ "ok": true }` acknowledgement for write endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"missing_fields"`).
    pub error: String,
    /// Fields the caller must supply, for `missing_fields`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need: Option<Vec<String>>,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] carrying only a code.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            need: None,
        }
    }

    /// Construct a `missing_fields` response listing the required fields.
    pub fn missing(need: Vec<String>) -> Self {
        Self {
            error: "missing_fields".into(),
            need: Some(need),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /api/healthz`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    /// Seconds since the process started.
    pub uptime: f64,
    /// Current server time, RFC 3339.
    pub now: String,
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Query string of `GET /api/fetch`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchQuery {
    /// Page size; non-numeric or non-positive values fall back to the default.
    pub limit: Option<String>,
    /// Exact site filter.
    pub site: Option<String>,
}

/// One event as returned to an authenticated reader.
///
/// `contactDeets` is decrypted and masked; lookup tokens are passed through.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub site: String,
    pub path: String,
    #[serde(rename = "campaignId", default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testimonial: Option<Value>,
    #[serde(rename = "contactDeets", default, skip_serializing_if = "Option::is_none")]
    pub contact_deets: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_hash: Option<String>,
    pub ts: DateTime<Utc>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(rename = "ipHash", default, skip_serializing_if = "Option::is_none")]
    pub ip_hash: Option<String>,
}

/// Response body for `GET /api/fetch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub ok: bool,
    pub count: usize,
    pub events: Vec<EventView>,
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Query string or JSON body of `DELETE /api/delete`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteRequest {
    pub id: Option<String>,
}

/// Response body for `DELETE /api/delete`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub ok: bool,
    #[serde(rename = "deletedCount")]
    pub deleted_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_response_omits_empty_need() {
        let json = serde_json::to_value(ErrorResponse::new("server_error")).unwrap();
        assert_eq!(json, json!({"error": "server_error"}));
    }

    #[test]
    fn missing_fields_shape() {
        let e = ErrorResponse::missing(vec!["site".into(), "path".into()]);
        let json = serde_json::to_value(e).unwrap();
        assert_eq!(json, json!({"error": "missing_fields", "need": ["site", "path"]}));
    }

    #[test]
    fn event_view_uses_stored_member_names() {
        let view = EventView {
            id: Uuid::nil(),
            kind: "submission".into(),
            site: "portal".into(),
            path: "/act/1".into(),
            campaign_id: Some("test".into()),
            testimonial: None,
            contact_deets: None,
            email_hash: Some("ab".into()),
            phone_hash: None,
            ts: DateTime::from_timestamp(0, 0).unwrap(),
            referrer: None,
            user_agent: Some("curl".into()),
            ip_hash: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["type"], "submission");
        assert_eq!(json["campaignId"], "test");
        assert_eq!(json["userAgent"], "curl");
        assert!(json.get("contactDeets").is_none());
        assert!(json.get("phone_hash").is_none());
    }

    #[test]
    fn delete_response_serde() {
        let json = serde_json::to_value(DeleteResponse {
            ok: true,
            deleted_count: 1,
        })
        .unwrap();
        assert_eq!(json, json!({"ok": true, "deletedCount": 1}));
    }
}
