//! Span helpers for events flowing through the worker.

use tracing::Span;

use crate::model::{EventId, EventStatus};

/// Start a span for one processing attempt of an event.
///
/// Takes the stored type tag, which may not be a known event type.
///
/// The `event.status` field is declared empty and filled by
/// [`record_state_transition`].
pub fn start_event_span(event_type: &str, id: EventId, attempt: u32) -> Span {
    tracing::info_span!(
        "event.process",
        "event.type" = event_type,
        "event.id" = %id,
        "event.attempt" = attempt,
        "event.status" = tracing::field::Empty,
    )
}

/// Record a status transition on the given span.
pub fn record_state_transition(span: &Span, from: EventStatus, to: EventStatus) {
    span.record("event.status", to.as_str());
    span.in_scope(|| {
        tracing::info!(from = from.as_str(), to = to.as_str(), "state_transition");
    });
}
