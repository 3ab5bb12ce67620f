use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use murmur_types::{Document, MessageBody};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::feed::{Feed, Subscription};
use crate::MessageStore;

/// In-process document collection.
///
/// Behaves like the durable store from a subscriber's point of view and adds
/// fault injection hooks: failing appends, dropping connectivity, and writing
/// raw bodies that bypass the message schema.
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    feed: Feed,
}

struct MemoryInner {
    documents: BTreeMap<String, Value>,
    failures_pending: usize,
    connected: bool,
}

impl MemoryInner {
    fn snapshot(&self) -> Vec<Document> {
        self.documents
            .iter()
            .map(|(key, body)| Document::new(key.clone(), body.clone()))
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                documents: BTreeMap::new(),
                failures_pending: 0,
                connected: true,
            }),
            feed: Feed::new(Vec::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store an arbitrary body under `key`, schema or not.
    pub fn insert_raw(&self, key: impl Into<String>, body: Value) {
        let mut inner = self.lock();
        inner.documents.insert(key.into(), body);
        if inner.connected {
            self.feed.publish_live(inner.snapshot());
        }
    }

    /// Make the next `count` appends fail without touching the collection.
    pub fn fail_next_appends(&self, count: usize) {
        self.lock().failures_pending = count;
    }

    /// Simulate losing or regaining the connection to the store.
    pub fn set_connected(&self, connected: bool) {
        let mut inner = self.lock();
        if inner.connected == connected {
            return;
        }
        inner.connected = connected;

        if connected {
            debug!("memory store reconnected");
            self.feed.publish_live(inner.snapshot());
        } else {
            debug!("memory store disconnected");
            self.feed.publish_suspended("connection lost");
        }
    }

    pub fn len(&self) -> usize {
        self.lock().documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().documents.get(key).cloned()
    }
}

impl MessageStore for MemoryStore {
    fn subscribe(&self) -> Subscription {
        self.feed.subscribe()
    }

    async fn append(&self, key: &str, body: &MessageBody) -> Result<(), StoreError> {
        let value = body.to_value()?;
        let mut inner = self.lock();

        if !inner.connected {
            return Err(StoreError::Unavailable("connection lost".into()));
        }

        if inner.failures_pending > 0 {
            inner.failures_pending -= 1;
            warn!("memory store rejecting append of '{}' (injected failure)", key);
            return Err(StoreError::Unavailable("injected failure".into()));
        }

        if inner.documents.insert(key.to_string(), value).is_some() {
            warn!("document '{}' overwritten by a later append", key);
        }

        self.feed.publish_live(inner.snapshot());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::feed::CollectionState;

    fn body(content: &str, created_at: i64) -> MessageBody {
        MessageBody {
            author: "Alice".into(),
            content: content.into(),
            created_at,
            platform: "desktop".into(),
        }
    }

    #[tokio::test]
    async fn empty_store_publishes_empty_collection() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe();
        assert_eq!(sub.current().documents().map(|d| d.len()), Some(0));
    }

    #[tokio::test]
    async fn append_publishes_full_collection() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe();
        sub.current();

        store.append("m1", &body("one", 1)).await.unwrap();
        store.append("m2", &body("two", 2)).await.unwrap();

        let state = sub.changed().await.unwrap();
        let keys: Vec<&str> = state.documents().unwrap().iter().map(|d| d.key.as_str()).collect();
        assert_eq!(keys, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn same_key_is_last_writer_wins() {
        let store = MemoryStore::new();
        store.append("dup", &body("first", 1)).await.unwrap();
        store.append("dup", &body("second", 2)).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("dup").unwrap()["content"], "second");
    }

    #[tokio::test]
    async fn appended_body_is_stored_as_encoded_object() {
        let store = MemoryStore::new();
        store.append("m1", &body("hello", 7)).await.unwrap();

        assert_eq!(
            store.get("m1").unwrap(),
            json!({
                "author": "Alice",
                "content": "hello",
                "createdAt": 7,
                "platform": "desktop",
            })
        );
    }

    #[tokio::test]
    async fn injected_failures_leave_collection_untouched() {
        let store = MemoryStore::new();
        store.fail_next_appends(1);

        let err = store.append("m1", &body("lost", 1)).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.is_empty());

        store.append("m1", &body("kept", 1)).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn disconnect_suspends_and_reconnect_restores() {
        let store = MemoryStore::new();
        store.insert_raw("a", json!({ "anything": true }));
        let mut sub = store.subscribe();
        sub.current();

        store.set_connected(false);
        assert!(matches!(sub.changed().await.unwrap(), CollectionState::Suspended { .. }));
        assert!(store.append("b", &body("offline", 1)).await.is_err());

        store.set_connected(true);
        let state = sub.changed().await.unwrap();
        assert_eq!(state.documents().unwrap().len(), 1);
    }
}
