//! Core data model.
//!
//! A queue event is a typed unit of work with an opaque payload. Its
//! lifecycle runs PENDING → PROCESSING → COMPLETED, or back to PENDING
//! on a failed attempt until the retry budget runs out and it lands in FAILED.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque event payload. Only the handler for the event's type interprets it.
pub type Payload = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// An event as stored in `queue_events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEvent {
    /// Assigned by the store on insert.
    pub id: EventId,

    /// Selects the handler.
    #[serde(rename = "type")]
    pub event_type: EventType,

    pub data: Payload,

    pub status: EventStatus,

    /// Failed processing attempts so far. Never decreases.
    pub retries: u32,

    /// Fixes FIFO order. Retried events keep their original position.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Newtype for event IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ---------------------------------------------------------------------------
// Event type
// ---------------------------------------------------------------------------

/// Kinds of event the queue knows about. Add a variant and register a
/// handler for it to introduce new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    NewToken,
}

impl EventType {
    pub const ALL: &'static [EventType] = &[EventType::NewToken];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::NewToken => "NEW_TOKEN",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown event type: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Waiting to be claimed.
    Pending,
    /// Claimed by the worker, handler running.
    Processing,
    /// Handler succeeded. Terminal.
    Completed,
    /// Retry budget exhausted. Terminal.
    Failed,
}

impl EventStatus {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: EventStatus) -> bool {
        use EventStatus::*;
        matches!(
            (self, to),
            (Pending, Processing)
                | (Processing, Completed)
                | (Processing, Pending) // retry
                | (Processing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, EventStatus::Completed | EventStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Pending => "PENDING",
            EventStatus::Processing => "PROCESSING",
            EventStatus::Completed => "COMPLETED",
            EventStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(EventStatus::Pending),
            "PROCESSING" => Ok(EventStatus::Processing),
            "COMPLETED" => Ok(EventStatus::Completed),
            "FAILED" => Ok(EventStatus::Failed),
            _ => Err(format!("unknown event status: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// An event before insertion. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub(crate) event_type: EventType,
    pub(crate) data: Payload,
    pub(crate) status: EventStatus,
    pub(crate) retries: u32,
}

impl NewEvent {
    /// A fresh PENDING event with no failed attempts.
    pub fn new(event_type: EventType, data: Payload) -> Self {
        Self {
            event_type,
            data,
            status: EventStatus::Pending,
            retries: 0,
        }
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn data(&self) -> &Payload {
        &self.data
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}

/// Partial row update written by the worker on every transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusUpdate {
    pub status: EventStatus,
    /// `None` leaves the stored count untouched.
    pub retries: Option<u32>,
    pub updated_at: DateTime<Utc>,
}

impl StatusUpdate {
    pub fn new(status: EventStatus) -> Self {
        Self {
            status,
            retries: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }
}
