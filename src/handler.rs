//! Event handlers and the type → handler registry.
//!
//! Handlers only consume payloads. They never see ids, statuses or retry
//! counts; the worker owns every store write.

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

use crate::error::HandlerError;
use crate::model::{EventType, Payload};

/// Performs the work for one event type.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, data: &Payload) -> Result<(), HandlerError>;
}

/// Any `async` closure over an owned payload is a handler.
#[async_trait]
impl<F, Fut> EventHandler for F
where
    F: Fn(Payload) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, data: &Payload) -> Result<(), HandlerError> {
        (self)(data.clone()).await
    }
}

/// Registry of handlers, exactly one per event type.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<EventType, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    /// Create an empty registry. Every event dispatched through it fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in handler for every known event type.
    pub fn with_defaults() -> Self {
        Self::empty().with(EventType::NewToken, NewTokenHandler)
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, event_type: EventType, handler: impl EventHandler + 'static) -> Self {
        self.register(event_type, handler);
        self
    }

    /// Register `handler` for `event_type`, replacing any previous one.
    pub fn register(&mut self, event_type: EventType, handler: impl EventHandler + 'static) {
        self.handlers.insert(event_type, Arc::new(handler));
    }

    /// Look up the handler for an event type.
    pub fn get(&self, event_type: EventType) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.get(&event_type)
    }

    pub fn handles(&self, event_type: EventType) -> bool {
        self.handlers.contains_key(&event_type)
    }

    /// Run the handler for `event_type`. An unmapped type is a handler failure.
    pub async fn dispatch(&self, event_type: EventType, data: &Payload) -> Result<(), HandlerError> {
        let handler = self
            .get(event_type)
            .ok_or(HandlerError::NoHandler(event_type))?;
        handler.handle(data).await
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("event_types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Built-in handler for `NEW_TOKEN`. Records the token it was told about.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewTokenHandler;

#[async_trait]
impl EventHandler for NewTokenHandler {
    async fn handle(&self, data: &Payload) -> Result<(), HandlerError> {
        let token_id = data
            .get("tokenId")
            .and_then(|v| v.as_str())
            .unwrap_or("-");
        let name = data.get("name").and_then(|v| v.as_str()).unwrap_or("-");
        info!(token_id, name, "processing NEW_TOKEN event");
        Ok(())
    }
}
