//! Metric instrument factories for eventq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! Without an OTLP endpoint the global provider is a no-op.

use opentelemetry::metrics::{Counter, Histogram, Meter};

fn meter() -> Meter {
    opentelemetry::global::meter("eventq")
}

/// Counter: events handed to the producer.
/// Labels: `event_type`, `result` ("ok" | "error").
pub fn events_added() -> Counter<u64> {
    meter()
        .u64_counter("eventq.events.added")
        .with_description("Number of events added to the queue")
        .build()
}

/// Counter: event status transitions written by the worker.
/// Labels: `from`, `to`, `result` ("ok" | "error").
pub fn event_transitions() -> Counter<u64> {
    meter()
        .u64_counter("eventq.event.transitions")
        .with_description("Number of event status transitions")
        .build()
}

/// Counter: events whose type has no registered handler.
/// Labels: `event_type`.
pub fn events_unroutable() -> Counter<u64> {
    meter()
        .u64_counter("eventq.events.unroutable")
        .with_description("Events dispatched with no matching handler")
        .build()
}

/// Counter: failed polls of the store.
pub fn poll_errors() -> Counter<u64> {
    meter()
        .u64_counter("eventq.poll.errors")
        .with_description("Failed attempts to select the next pending event")
        .build()
}

/// Histogram: handler run time in milliseconds.
/// Labels: `event_type`, `outcome` ("ok" | "error").
pub fn handler_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("eventq.handler.duration_ms")
        .with_description("Handler run time in milliseconds")
        .with_unit("ms")
        .build()
}
