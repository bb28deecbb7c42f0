//! Store semantics shared by both implementations.

use eventq::error::StoreError;
use eventq::model::*;
use eventq::store::{EventStore, MemoryEventStore};
use serde_json::json;

fn token(id: &str) -> NewEvent {
    NewEvent::new(
        EventType::NewToken,
        json!({"tokenId": id}).as_object().cloned().unwrap(),
    )
}

async fn oldest_pending_token(store: &impl EventStore) -> Option<String> {
    store
        .select_oldest_pending()
        .await
        .unwrap()
        .map(|e| e.data["tokenId"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn oldest_pending_follows_creation_order() {
    let store = MemoryEventStore::new();
    assert_eq!(oldest_pending_token(&store).await, None);

    store.insert(token("a")).await.unwrap();
    store.insert(token("b")).await.unwrap();
    assert_eq!(oldest_pending_token(&store).await.as_deref(), Some("a"));

    let a = store.select_oldest_pending().await.unwrap().unwrap();
    store
        .update_status(a.id, StatusUpdate::new(EventStatus::Processing))
        .await
        .unwrap();
    assert_eq!(oldest_pending_token(&store).await.as_deref(), Some("b"));

    // Requeued events go back to their original position.
    store
        .update_status(a.id, StatusUpdate::new(EventStatus::Pending).with_retries(1))
        .await
        .unwrap();
    assert_eq!(oldest_pending_token(&store).await.as_deref(), Some("a"));
}

#[tokio::test]
async fn update_without_retries_keeps_the_count() {
    let store = MemoryEventStore::new();
    store.insert(token("a")).await.unwrap();
    let event = store.select_oldest_pending().await.unwrap().unwrap();

    store
        .update_status(event.id, StatusUpdate::new(EventStatus::Processing).with_retries(2))
        .await
        .unwrap();
    store
        .update_status(event.id, StatusUpdate::new(EventStatus::Completed))
        .await
        .unwrap();

    let stored = store.get_event(event.id).await.unwrap();
    assert_eq!(stored.status, EventStatus::Completed);
    assert_eq!(stored.retries, 2);
    assert!(stored.updated_at >= event.updated_at);
}

#[tokio::test]
async fn update_of_unknown_id_is_not_found() {
    let store = MemoryEventStore::new();
    let id = EventId::new();
    let err = store
        .update_status(id, StatusUpdate::new(EventStatus::Completed))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
}

#[tokio::test]
async fn list_filters_by_status_and_limit() {
    let store = MemoryEventStore::new();
    for id in ["a", "b", "c"] {
        store.insert(token(id)).await.unwrap();
    }
    let first = store.select_oldest_pending().await.unwrap().unwrap();
    store
        .update_status(first.id, StatusUpdate::new(EventStatus::Processing))
        .await
        .unwrap();

    assert_eq!(store.list_events(None, 10).await.unwrap().len(), 3);
    assert_eq!(store.list_events(None, 2).await.unwrap().len(), 2);
    let pending = store
        .list_events(Some(EventStatus::Pending), 10)
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().all(|e| e.status == EventStatus::Pending));
}
