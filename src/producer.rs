//! Producer: appends new PENDING events to the store.

use opentelemetry::KeyValue;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{QueueError, Result};
use crate::model::{EventType, NewEvent, Payload};
use crate::store::EventStore;
use crate::telemetry::metrics;

/// Adds events to the queue.
///
/// ```no_run
/// # async fn demo(db: eventq::db::Db) -> eventq::error::Result<()> {
/// use eventq::model::EventType;
/// use eventq::producer::Producer;
/// use std::sync::Arc;
///
/// let producer = Producer::new(Arc::new(db));
/// let data = serde_json::json!({"tokenId": "123"});
/// producer
///     .add_event(EventType::NewToken, data.as_object().cloned().unwrap_or_default())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Producer {
    store: Arc<dyn EventStore>,
}

impl Producer {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    /// Insert a PENDING event with zero retries. The payload is stored verbatim.
    pub async fn add_event(&self, event_type: EventType, data: Payload) -> Result<()> {
        let result = self.store.insert(NewEvent::new(event_type, data)).await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::events_added().add(
            1,
            &[
                KeyValue::new("event_type", event_type.as_str()),
                KeyValue::new("result", outcome),
            ],
        );

        match result {
            Ok(()) => {
                info!(%event_type, "event added to queue");
                Ok(())
            }
            Err(source) => {
                error!(%event_type, error = %source, "failed to add event");
                Err(QueueError::AddEvent { event_type, source })
            }
        }
    }
}
