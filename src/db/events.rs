//! `queue_events` queries: the three store operations plus operator reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{EventId, EventStatus, EventType, NewEvent, Payload, QueueEvent, StatusUpdate};
use crate::store::EventStore;

const EVENT_COLUMNS: &str = "id, type, data, status, retries, created_at, updated_at";

impl super::Db {
    /// Get an event by ID.
    pub async fn get_event(&self, id: EventId) -> Result<QueueEvent, StoreError> {
        let row: Option<QueueEventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM queue_events WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(self.pool())
        .await?;

        row.ok_or(StoreError::NotFound(id))?.try_into_event()
    }

    /// List events oldest first, optionally filtered by status.
    pub async fn list_events(
        &self,
        status: Option<EventStatus>,
        limit: i64,
    ) -> Result<Vec<QueueEvent>, StoreError> {
        let rows: Vec<QueueEventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM queue_events
             WHERE ($1::text IS NULL OR status = $1)
             ORDER BY created_at ASC, seq ASC
             LIMIT $2"
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(QueueEventRow::try_into_event).collect()
    }
}

#[async_trait]
impl EventStore for super::Db {
    async fn insert(&self, event: NewEvent) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO queue_events (type, data, status, retries)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(event.event_type.as_str())
        .bind(serde_json::Value::Object(event.data))
        .bind(event.status.as_str())
        .bind(event.retries as i32)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn select_oldest_pending(&self) -> Result<Option<QueueEvent>, StoreError> {
        let row: Option<QueueEventRow> = sqlx::query_as(&format!(
            "SELECT {EVENT_COLUMNS} FROM queue_events
             WHERE status = 'PENDING'
             ORDER BY created_at ASC, seq ASC
             LIMIT 1"
        ))
        .fetch_optional(self.pool())
        .await?;

        row.map(QueueEventRow::try_into_event).transpose()
    }

    async fn update_status(&self, id: EventId, update: StatusUpdate) -> Result<(), StoreError> {
        let rows_affected = sqlx::query(
            "UPDATE queue_events
             SET status = $1, retries = COALESCE($2, retries), updated_at = $3
             WHERE id = $4",
        )
        .bind(update.status.as_str())
        .bind(update.retries.map(|n| n as i32))
        .bind(update.updated_at)
        .bind(id.0)
        .execute(self.pool())
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct QueueEventRow {
    id: Uuid,
    #[sqlx(rename = "type")]
    event_type: String,
    data: serde_json::Value,
    status: String,
    retries: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl QueueEventRow {
    /// Status is always readable (the column has a CHECK). Anything else that
    /// does not decode is reported as [`StoreError::Undecodable`] so the
    /// worker can still fail the row instead of stalling on it.
    fn try_into_event(self) -> Result<QueueEvent, StoreError> {
        let status: EventStatus = self.status.parse().map_err(StoreError::Decode)?;
        let (event_type, data, retries) = self.decode_fields().map_err(|reason| {
            StoreError::Undecodable {
                id: EventId(self.id),
                event_type: self.event_type.clone(),
                retries: self.retries.max(0) as u32,
                reason,
            }
        })?;

        Ok(QueueEvent {
            id: EventId(self.id),
            event_type,
            data,
            status,
            retries,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }

    fn decode_fields(&self) -> Result<(EventType, Payload, u32), String> {
        let event_type: EventType = self.event_type.parse()?;
        let data = match &self.data {
            serde_json::Value::Object(map) => map.clone(),
            other => return Err(format!("data is not an object: {other}")),
        };
        let retries = u32::try_from(self.retries)
            .map_err(|_| format!("negative retries: {}", self.retries))?;
        Ok((event_type, data, retries))
    }
}
