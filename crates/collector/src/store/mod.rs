//! Event persistence interface.
//!
//! The service hands fully protected documents to an [`EventStore`]: contact
//! fields are already encrypted and lookup tokens already computed. Stores
//! never see plaintext contact data and never decrypt.
//!
//! [`MemoryEventStore`] is the bundled implementation used for local runs and
//! tests.

pub mod memory;

pub use memory::MemoryEventStore;

use chrono::{DateTime, Utc};
use pii::{LookupToken, ProtectedRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or is in a bad state.
    #[error("event store unavailable: {0}")]
    Unavailable(String),
}

/// An event document as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub site: String,
    pub path: String,
    #[serde(rename = "campaignId", default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    /// Free-form testimonial, stored as received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub testimonial: Option<Value>,
    /// Contact details with every top-level string encrypted.
    #[serde(rename = "contactDeets", default, skip_serializing_if = "Option::is_none")]
    pub contact_deets: Option<ProtectedRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_hash: Option<LookupToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_hash: Option<LookupToken>,
    pub ts: DateTime<Utc>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(rename = "userAgent", default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(rename = "ipHash", default, skip_serializing_if = "Option::is_none")]
    pub ip_hash: Option<String>,
}

/// Exact-match filter for [`EventStore::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub site: Option<String>,
}

impl EventFilter {
    /// Returns `true` if `event` satisfies every set criterion.
    pub fn matches(&self, event: &StoredEvent) -> bool {
        self.site.as_deref().map_or(true, |site| event.site == site)
    }
}

/// Storage collaborator for event documents.
#[cfg_attr(test, mockall::automock)]
pub trait EventStore: Send + Sync {
    /// Persist a new event.
    fn insert(&self, event: StoredEvent) -> Result<(), StoreError>;

    /// Events matching `filter`, newest first, at most `limit` of them.
    fn list(&self, filter: &EventFilter, limit: usize) -> Result<Vec<StoredEvent>, StoreError>;

    /// Delete the event with `id`, returning how many documents were removed.
    fn delete(&self, id: Uuid) -> Result<u64, StoreError>;
}
