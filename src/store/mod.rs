//! The event store contract the producer and worker are written against.
//!
//! Two implementations ship with the crate: [`Db`](crate::db::Db) backed by
//! Postgres, and [`MemoryEventStore`] for tests and local runs. Each call is
//! assumed atomic at the row level; nothing here locks across calls.

pub mod memory;

pub use memory::MemoryEventStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{EventId, NewEvent, QueueEvent, StatusUpdate};

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append a new row. The store assigns id, `created_at` and `updated_at`.
    async fn insert(&self, event: NewEvent) -> Result<(), StoreError>;

    /// The PENDING event with the smallest `created_at`, if any.
    async fn select_oldest_pending(&self) -> Result<Option<QueueEvent>, StoreError>;

    /// Partial update by id. Fails with [`StoreError::NotFound`] if no row matches.
    async fn update_status(&self, id: EventId, update: StatusUpdate) -> Result<(), StoreError>;
}
