//! In-process event store.
//!
//! Same ordering and update semantics as the Postgres store. Rows live in
//! insertion order, so `created_at` ties resolve to the earlier insert.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::EventStore;
use crate::error::StoreError;
use crate::model::{EventId, EventStatus, NewEvent, QueueEvent, StatusUpdate};

/// Cheap to clone; clones share the same rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventStore {
    events: Arc<Mutex<Vec<QueueEvent>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an event by ID.
    pub async fn get_event(&self, id: EventId) -> Result<QueueEvent, StoreError> {
        self.events
            .lock()
            .await
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    /// List events oldest first, optionally filtered by status.
    pub async fn list_events(
        &self,
        status: Option<EventStatus>,
        limit: usize,
    ) -> Result<Vec<QueueEvent>, StoreError> {
        let events = self.events.lock().await;
        let mut matching: Vec<QueueEvent> = events
            .iter()
            .filter(|e| status.is_none_or(|s| e.status == s))
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        matching.sort_by_key(|e| e.created_at);
        matching.truncate(limit);
        Ok(matching)
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, event: NewEvent) -> Result<(), StoreError> {
        let now = Utc::now();
        self.events.lock().await.push(QueueEvent {
            id: EventId::new(),
            event_type: event.event_type,
            data: event.data,
            status: event.status,
            retries: event.retries,
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    async fn select_oldest_pending(&self) -> Result<Option<QueueEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .filter(|e| e.status == EventStatus::Pending)
            .min_by_key(|e| e.created_at)
            .cloned())
    }

    async fn update_status(&self, id: EventId, update: StatusUpdate) -> Result<(), StoreError> {
        let mut events = self.events.lock().await;
        let event = events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound(id))?;
        event.status = update.status;
        if let Some(retries) = update.retries {
            event.retries = retries;
        }
        event.updated_at = update.updated_at;
        Ok(())
    }
}
