//! Worker: polls for the oldest PENDING event, dispatches it, and writes
//! the outcome back to the store.
//!
//! One event is in flight at a time. Nothing that goes wrong with a single
//! event (store write, missing handler, unreadable row, handler error, panic,
//! timeout) escapes [`Worker::process_next_event`]; it becomes a status write
//! and a log line.
//!
//! Only one worker should run against a store. Claims are plain status
//! writes with no row locking, so two workers can pick up the same event.

use opentelemetry::KeyValue;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::error::{HandlerError, StoreError};
use crate::handler::HandlerRegistry;
use crate::model::{EventId, EventStatus, EventType, QueueEvent, StatusUpdate};
use crate::store::EventStore;
use crate::telemetry::event::{record_state_transition, start_event_span};
use crate::telemetry::metrics;

/// Worker settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Attempts (including the first) before an event is FAILED.
    pub max_retries: u32,
    /// Wait between poll iterations.
    pub poll_interval: Duration,
    /// Abort a handler that runs longer than this and count it as a failure.
    pub handler_timeout: Option<Duration>,
    /// Sleep after an iteration that found work too. Turning this off
    /// drains a backlog without waiting `poll_interval` per event.
    pub sleep_when_busy: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            poll_interval: Duration::from_secs(5),
            handler_timeout: None,
            sleep_when_busy: true,
        }
    }
}

/// How a processing attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Handler succeeded.
    Completed,
    /// Handler failed with budget left; the event is PENDING again.
    Retrying { retries: u32 },
    /// Handler failed and the budget is spent.
    Failed { retries: u32 },
    /// The claim write failed; the handler was not run.
    Skipped,
}

/// The poll/dispatch/retry loop.
#[derive(Clone)]
pub struct Worker {
    store: Arc<dyn EventStore>,
    registry: Arc<HandlerRegistry>,
    config: WorkerConfig,
    shutdown: CancellationToken,
}

impl Worker {
    pub fn new(
        store: Arc<dyn EventStore>,
        registry: Arc<HandlerRegistry>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            registry,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Signal the loop to stop. An event already in flight finishes first.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Token that stops the loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the poll loop until [`shutdown`](Self::shutdown) is called.
    pub async fn start(&self) {
        info!(
            max_retries = self.config.max_retries,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "queue worker started"
        );

        while !self.shutdown.is_cancelled() {
            let found = self.process_next_event().await.is_some();
            if found && !self.config.sleep_when_busy {
                continue;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("queue worker stopped");
    }

    /// One poll iteration. Returns `None` when there was nothing to do or
    /// the store could not be queried.
    pub async fn process_next_event(&self) -> Option<Resolution> {
        let event = match self.store.select_oldest_pending().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!("no pending events");
                return None;
            }
            Err(StoreError::Undecodable {
                id,
                event_type,
                retries,
                reason,
            }) => {
                return Some(self.process_undecodable(id, event_type, retries, reason).await);
            }
            Err(e) => {
                metrics::poll_errors().add(1, &[]);
                error!(error = %e, "error fetching event");
                return None;
            }
        };

        Some(self.process_event(event).await)
    }

    /// Claim, dispatch and resolve one event.
    ///
    /// The returned [`Resolution`] is what the worker decided; a failed
    /// terminal or retry write is logged but does not change it.
    pub async fn process_event(&self, event: QueueEvent) -> Resolution {
        let event_type = event.event_type.as_str();
        let span = start_event_span(event_type, event.id, event.retries + 1);
        self.attempt(span, event_type, event.id, event.retries, self.run_handler(&event))
            .await
    }

    /// A pending row the store could not read still costs an attempt, so it
    /// ends up FAILED instead of blocking everything queued behind it.
    async fn process_undecodable(
        &self,
        id: EventId,
        event_type: String,
        retries: u32,
        reason: String,
    ) -> Resolution {
        let span = start_event_span(&event_type, id, retries + 1);
        let err = match event_type.parse::<EventType>() {
            Ok(_) => HandlerError::failed(format!("undecodable event: {reason}")),
            Err(_) => {
                metrics::events_unroutable()
                    .add(1, &[KeyValue::new("event_type", event_type.clone())]);
                HandlerError::UnknownType(event_type.clone())
            }
        };
        span.in_scope(|| warn!(%reason, "pending event cannot be decoded"));

        self.attempt(span, &event_type, id, retries, async { Err::<(), _>(err) })
            .await
    }

    /// Claim the event, await `handler`, and write the outcome.
    async fn attempt<F>(
        &self,
        span: Span,
        event_type: &str,
        id: EventId,
        retries: u32,
        handler: F,
    ) -> Resolution
    where
        F: Future<Output = Result<(), HandlerError>>,
    {
        async {
            if let Err(e) = self
                .transition(&span, id, EventStatus::Pending, EventStatus::Processing, None)
                .await
            {
                warn!(error = %e, "failed to claim event, leaving it pending");
                return Resolution::Skipped;
            }

            let started = Instant::now();
            let result = handler.await;
            metrics::handler_duration_ms().record(
                started.elapsed().as_secs_f64() * 1000.0,
                &[
                    KeyValue::new("event_type", event_type.to_string()),
                    KeyValue::new("outcome", if result.is_ok() { "ok" } else { "error" }),
                ],
            );

            match result {
                Ok(()) => {
                    self.resolve(&span, id, EventStatus::Completed, None).await;
                    info!("event processed successfully");
                    Resolution::Completed
                }
                Err(err) => {
                    error!(error = %err, "error processing event");
                    let retries = retries + 1;
                    if retries >= self.config.max_retries {
                        self.resolve(&span, id, EventStatus::Failed, Some(retries))
                            .await;
                        info!(
                            retries,
                            max_retries = self.config.max_retries,
                            "event failed after exhausting retries"
                        );
                        Resolution::Failed { retries }
                    } else {
                        self.resolve(&span, id, EventStatus::Pending, Some(retries))
                            .await;
                        info!(
                            retries,
                            max_retries = self.config.max_retries,
                            "event requeued for retry"
                        );
                        Resolution::Retrying { retries }
                    }
                }
            }
        }
        .instrument(span.clone())
        .await
    }

    /// Run the handler on its own task so a panic or timeout stays contained.
    async fn run_handler(&self, event: &QueueEvent) -> Result<(), HandlerError> {
        let event_type = event.event_type;
        if !self.registry.handles(event_type) {
            metrics::events_unroutable()
                .add(1, &[KeyValue::new("event_type", event_type.as_str())]);
        }

        let registry = Arc::clone(&self.registry);
        let data = event.data.clone();
        let mut task = tokio::spawn(
            async move { registry.dispatch(event_type, &data).await }.instrument(Span::current()),
        );

        let joined = match self.config.handler_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    task.abort();
                    return Err(HandlerError::Timeout(limit));
                }
            },
            None => task.await,
        };

        joined.unwrap_or_else(|e| Err(HandlerError::Panicked(e.to_string())))
    }

    /// Write a post-handler status. Failures are logged, never raised.
    async fn resolve(&self, span: &Span, id: EventId, to: EventStatus, retries: Option<u32>) {
        if let Err(e) = self
            .transition(span, id, EventStatus::Processing, to, retries)
            .await
        {
            error!(error = %e, status = %to, "failed to record event status");
        }
    }

    async fn transition(
        &self,
        span: &Span,
        id: EventId,
        from: EventStatus,
        to: EventStatus,
        retries: Option<u32>,
    ) -> Result<(), StoreError> {
        debug_assert!(from.can_transition_to(to), "{from} -> {to}");

        let mut update = StatusUpdate::new(to);
        if let Some(retries) = retries {
            update = update.with_retries(retries);
        }
        let result = self.store.update_status(id, update).await;

        metrics::event_transitions().add(
            1,
            &[
                KeyValue::new("from", from.as_str()),
                KeyValue::new("to", to.as_str()),
                KeyValue::new("result", if result.is_ok() { "ok" } else { "error" }),
            ],
        );
        if result.is_ok() {
            record_state_transition(span, from, to);
        }
        result
    }
}
