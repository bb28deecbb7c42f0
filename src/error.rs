//! Error types for eventq.

use thiserror::Error;

use crate::model::{EventId, EventType};

/// Failure reported by an [`EventStore`](crate::store::EventStore).
///
/// Always recoverable at the call site: the producer surfaces it to its
/// caller, the worker logs it and abandons the current step.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event not found: {0}")]
    NotFound(EventId),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt event row: {0}")]
    Decode(String),

    /// A stored event whose type, payload or retry count cannot be read.
    /// Carries enough of the row for the worker to fail the attempt.
    #[error("undecodable event {id} ({event_type}): {reason}")]
    Undecodable {
        id: EventId,
        event_type: String,
        retries: u32,
        reason: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Failure raised while processing an event's payload.
///
/// Caught by the worker and converted into a retry or FAILED transition.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("no handler for event type: {0}")]
    NoHandler(EventType),

    /// Stored type tag that is not an [`EventType`].
    #[error("no handler for event type: {0}")]
    UnknownType(String),

    #[error("handler timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Crate-level error. Only producer-side store failures, configuration and
/// telemetry setup reach callers; worker-side failures become status writes.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to add event ({event_type}): {source}")]
    AddEvent {
        event_type: EventType,
        #[source]
        source: StoreError,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("telemetry error: {0}")]
    Telemetry(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;
