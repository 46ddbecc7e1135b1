//! [`MemoryEventStore`]: process-local event storage.

use std::sync::{Arc, RwLock};

use uuid::Uuid;

use super::{EventFilter, EventStore, StoreError, StoredEvent};

/// Thread-safe in-memory event store.
///
/// Events are kept in insertion order behind an `Arc<RwLock<_>>`; listing
/// walks them newest first. Contents are lost on restart.
#[derive(Clone, Debug, Default)]
pub struct MemoryEventStore {
    inner: Arc<RwLock<Vec<StoredEvent>>>,
}

impl MemoryEventStore {
    /// Create a new, empty [`MemoryEventStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("event store lock poisoned".into())
}

impl EventStore for MemoryEventStore {
    fn insert(&self, event: StoredEvent) -> Result<(), StoreError> {
        self.inner.write().map_err(poisoned)?.push(event);
        Ok(())
    }

    fn list(&self, filter: &EventFilter, limit: usize) -> Result<Vec<StoredEvent>, StoreError> {
        let events = self.inner.read().map_err(poisoned)?;
        let mut matching: Vec<StoredEvent> = events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        // Stable sort keeps later inserts first among equal timestamps.
        matching.reverse();
        matching.sort_by(|a, b| b.ts.cmp(&a.ts));
        matching.truncate(limit);
        Ok(matching)
    }

    fn delete(&self, id: Uuid) -> Result<u64, StoreError> {
        let mut events = self.inner.write().map_err(poisoned)?;
        let before = events.len();
        events.retain(|e| e.id != id);
        Ok((before - events.len()) as u64)
    }
}
