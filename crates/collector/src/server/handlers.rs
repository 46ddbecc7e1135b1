//! Axum request handlers for all service endpoints.
//!
//! Write paths protect contact details before anything reaches the store:
//! lookup tokens are derived from the plaintext, then every top-level string
//! is encrypted. The read path decrypts and masks.

use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use common::protocol::{
    DeleteRequest, DeleteResponse, EventView, FetchQuery, FetchResponse, HealthResponse,
    OkResponse,
};
use common::ServiceError;
use pii::{
    compute_lookup_token, decrypt_object, encrypt_object, hash_client_ip, mask_contact_details,
    number_text, EncryptError, KeyMaterial, LookupToken, ProtectedRecord, SecretKey,
};
use serde_json::{Map, Value};
use tracing::{error, info};
use uuid::Uuid;

use super::state::{AppState, Settings};
use crate::store::{EventFilter, StoredEvent};

/// Fields every event must carry.
const REQUIRED_FIELDS: [&str; 2] = ["site", "path"];

/// Render a [`ServiceError`] as its status code and JSON body.
pub fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.to_body())).into_response()
}

/// `GET /api`: Plain-text liveness probe.
pub async fn index() -> &'static str {
    "OK"
}

/// `GET /api/healthz`: Uptime and server time.
pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        uptime: state.started_at.elapsed().as_secs_f64(),
        now: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

/// `POST /api/track`: Record a page view or action.
///
/// Accepts JSON sent as `application/json` or as a `text/plain` beacon; an
/// unparseable body is treated as empty.
pub async fn track_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> Response {
    let body = parse_body(&body);
    let event = match new_event(&body, "", &headers, peer.as_ref(), &state.settings) {
        Ok(e) => e,
        Err(e) => return error_response(e),
    };
    store_event(&state, event)
}

/// `POST /api/submission`: Record a form submission with contact details.
///
/// `contactDeets` is protected before storage: `email_hash` and `phone_hash`
/// lookup tokens are derived from the plaintext, then every top-level string
/// is encrypted. If protection fails nothing is stored.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> Response {
    let body = parse_body(&body);
    let mut event = match new_event(&body, "submission", &headers, peer.as_ref(), &state.settings)
    {
        Ok(e) => e,
        Err(e) => return error_response(e),
    };

    event.testimonial = body.get("testimonial").filter(|v| !v.is_null()).cloned();

    if let Some(contact) = body.get("contactDeets").and_then(Value::as_object) {
        match protect_contact(contact, &state.keys) {
            Ok(protected) => {
                event.contact_deets = Some(protected.record);
                event.email_hash = protected.email_hash;
                event.phone_hash = protected.phone_hash;
            }
            Err(e) => {
                error!(error = %e, "contact details could not be encrypted");
                return error_response(ServiceError::EncryptionFailure(e.to_string()));
            }
        }
    }

    store_event(&state, event)
}

/// `GET /api/fetch`: Newest events, contact details decrypted then masked.
pub async fn fetch_events(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Response {
    let limit = page_limit(query.limit.as_deref(), &state.settings);
    let filter = EventFilter {
        site: query.site.filter(|s| !s.is_empty()),
    };

    let events = match state.store.list(&filter, limit) {
        Ok(events) => events,
        Err(e) => {
            error!(error = %e, "failed to list events");
            return error_response(ServiceError::Storage(e.to_string()));
        }
    };

    let key = state.keys.encryption_key();
    let events: Vec<EventView> = events.into_iter().map(|e| reveal_event(e, key)).collect();

    (
        StatusCode::OK,
        Json(FetchResponse {
            ok: true,
            count: events.len(),
            events,
        }),
    )
        .into_response()
}

/// `DELETE /api/delete`: Delete one event by id, from the query or JSON body.
pub async fn delete_event(
    State(state): State<AppState>,
    Query(query): Query<DeleteRequest>,
    body: Bytes,
) -> Response {
    let from_body: DeleteRequest = serde_json::from_slice(&body).unwrap_or_default();
    let raw_id = query
        .id
        .filter(|id| !id.trim().is_empty())
        .or(from_body.id)
        .unwrap_or_default();

    let Ok(id) = Uuid::parse_str(raw_id.trim()) else {
        return error_response(ServiceError::InvalidId);
    };

    match state.store.delete(id) {
        Ok(deleted_count) => {
            info!(event_id = %id, deleted_count, "event delete processed");
            (
                StatusCode::OK,
                Json(DeleteResponse {
                    ok: true,
                    deleted_count,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to delete event");
            error_response(ServiceError::Storage(e.to_string()))
        }
    }
}

/// Catch-all 404 handler.
pub async fn not_found() -> Response {
    error_response(ServiceError::NotFound)
}

// ---------------------------------------------------------------------------
// Event assembly helpers
// ---------------------------------------------------------------------------

/// Contact details ready for storage.
struct ProtectedContact {
    record: ProtectedRecord,
    email_hash: Option<LookupToken>,
    phone_hash: Option<LookupToken>,
}

/// Derive lookup tokens from the plaintext, then encrypt the record.
fn protect_contact(
    contact: &Map<String, Value>,
    keys: &KeyMaterial,
) -> Result<ProtectedContact, EncryptError> {
    let hmac_key = keys.hmac_key();
    let email_hash = lookup_source(contact.get("email"))
        .map(|email| compute_lookup_token(&email, hmac_key))
        .transpose()?;
    let phone_hash = lookup_source(contact.get("number"))
        .or_else(|| lookup_source(contact.get("phone")))
        .map(|phone| compute_lookup_token(&phone, hmac_key))
        .transpose()?;

    Ok(ProtectedContact {
        record: encrypt_object(contact, keys.encryption_key())?,
        email_hash,
        phone_hash,
    })
}

/// Text a lookup token is derived from: non-empty strings and numbers only.
fn lookup_source(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(number_text(n)),
        _ => None,
    }
}

fn reveal_event(event: StoredEvent, key: &SecretKey) -> EventView {
    let contact_deets = event
        .contact_deets
        .as_ref()
        .map(|record| mask_contact_details(decrypt_object(record, key)));

    EventView {
        id: event.id,
        kind: event.kind,
        site: event.site,
        path: event.path,
        campaign_id: event.campaign_id,
        testimonial: event.testimonial,
        contact_deets,
        email_hash: event.email_hash.map(|t| t.to_string()),
        phone_hash: event.phone_hash.map(|t| t.to_string()),
        ts: event.ts,
        referrer: event.referrer,
        user_agent: event.user_agent,
        ip_hash: event.ip_hash,
    }
}

fn store_event(state: &AppState, event: StoredEvent) -> Response {
    let (id, kind) = (event.id, event.kind.clone());
    match state.store.insert(event) {
        Ok(()) => {
            info!(event_id = %id, kind = %kind, "event stored");
            (StatusCode::OK, Json(OkResponse::ok())).into_response()
        }
        Err(e) => {
            error!(error = %e, "failed to store event");
            error_response(ServiceError::Storage(e.to_string()))
        }
    }
}

/// Build the common part of an event from the body and request metadata.
fn new_event(
    body: &Value,
    default_kind: &str,
    headers: &HeaderMap,
    peer: Option<&ConnectInfo<SocketAddr>>,
    settings: &Settings,
) -> Result<StoredEvent, ServiceError> {
    let site = text_field(body, "site");
    let path = text_field(body, "path");
    if site.is_empty() || path.is_empty() {
        return Err(ServiceError::MissingFields(
            REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
        ));
    }

    let kind = Some(text_field(body, "type"))
        .filter(|k| !k.is_empty())
        .unwrap_or_else(|| default_kind.to_owned());

    let ts = Utc::now();
    let ip_hash = client_ip(headers, peer.map(|ConnectInfo(addr)| addr))
        .map(|ip| hash_client_ip(&ip, &settings.ip_hash_secret, ts.date_naive()));

    Ok(StoredEvent {
        id: Uuid::new_v4(),
        kind,
        site,
        path,
        campaign_id: optional_text(body.get("campaignId")),
        testimonial: None,
        contact_deets: None,
        email_hash: None,
        phone_hash: None,
        ts,
        referrer: header_text(headers, header::REFERER.as_str())
            .or_else(|| header_text(headers, "referrer")),
        user_agent: header_text(headers, header::USER_AGENT.as_str()),
        ip_hash,
    })
}

/// Parse a JSON object body; anything else counts as `{}`.
fn parse_body(raw: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(raw) {
        Ok(v @ Value::Object(_)) => v,
        _ => Value::Object(Map::new()),
    }
}

/// Scalar member as trimmed text; empty when absent or not a scalar.
fn text_field(body: &Value, name: &str) -> String {
    match body.get(name) {
        Some(Value::String(s)) => s.trim().to_owned(),
        Some(Value::Number(n)) => number_text(n),
        Some(Value::Bool(true)) => "true".into(),
        _ => String::new(),
    }
}

fn optional_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(number_text(n)),
        Value::Bool(true) => Some("true".into()),
        _ => None,
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// First `X-Forwarded-For` entry, else the socket peer address.
fn client_ip(headers: &HeaderMap, peer: Option<&SocketAddr>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_owned)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn page_limit(raw: Option<&str>, settings: &Settings) -> usize {
    match raw.and_then(|l| l.trim().parse::<usize>().ok()) {
        Some(n) if n > 0 => n.min(settings.fetch_max_limit),
        _ => settings.fetch_default_limit,
    }
}
