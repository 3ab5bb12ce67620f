use std::sync::Arc;
use std::time::Duration;

use murmur_client::{
    ChatSession, FixedClock, MessageStream, PendingSession, SendCoordinator, SendError, SessionView,
};
use murmur_store::{MemoryStore, MessageStore, SqliteStore, StoreError, Subscription};
use murmur_types::{Message, MessageBody};
use tokio::sync::Semaphore;

/// Memory store whose appends block until a permit is released.
struct GatedStore {
    inner: MemoryStore,
    gate: Semaphore,
}

impl GatedStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            gate: Semaphore::new(0),
        }
    }

    fn release_one(&self) {
        self.gate.add_permits(1);
    }
}

impl MessageStore for GatedStore {
    fn subscribe(&self) -> Subscription {
        self.inner.subscribe()
    }

    async fn append(&self, key: &str, body: &MessageBody) -> Result<(), StoreError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| StoreError::Unavailable("gate closed".into()))?;
        permit.forget();
        self.inner.append(key, body).await
    }
}

async fn wait_for(
    session: &ChatSession,
    predicate: impl FnMut(&SessionView) -> bool,
) -> SessionView {
    let mut rx = session.subscribe();
    let view = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for session view")
        .expect("session view closed")
        .clone();
    view
}

fn body(author: &str, content: &str, created_at: i64) -> MessageBody {
    MessageBody {
        author: author.into(),
        content: content.into(),
        created_at,
        platform: "desktop".into(),
    }
}

#[tokio::test]
async fn first_append_to_empty_store() {
    let store = MemoryStore::new();
    let mut stream = MessageStream::from_store(&store);
    assert!(stream.next_snapshot().await.unwrap().is_empty());

    store.append("abc", &body("Alice", "hi", 100)).await.unwrap();

    let snapshot = stream.next_snapshot().await.unwrap();
    assert_eq!(
        snapshot.to_vec(),
        vec![Message::new("Alice", "hi", 100, "desktop").with_id("abc")]
    );
}

#[tokio::test]
async fn later_append_with_earlier_timestamp_sorts_first() {
    let store = MemoryStore::new();
    store.append("m2", &body("Alice", "two", 200)).await.unwrap();
    store.append("m1", &body("Alice", "one", 100)).await.unwrap();

    let snapshot = MessageStream::from_store(&store).next_snapshot().await.unwrap();
    let order: Vec<(&str, i64)> = snapshot.iter().map(|m| (m.id.as_str(), m.created_at)).collect();
    assert_eq!(order, vec![("m1", 100), ("m2", 200)]);
}

#[tokio::test]
async fn n_appends_produce_n_ordered_messages() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(FixedClock::new(0));
    let coordinator = SendCoordinator::with_clock(store.clone(), clock.clone());

    // Timestamps deliberately jump around.
    let stamps = [50, 10, 90, 10, 70, 30, 30, 0, 100, 60];
    for (i, stamp) in stamps.iter().enumerate() {
        clock.set(*stamp);
        coordinator
            .send("Alice", &format!("message {}", i), "desktop")
            .await
            .unwrap();
    }

    let snapshot = MessageStream::from_store(store.as_ref()).next_snapshot().await.unwrap();
    assert_eq!(snapshot.len(), stamps.len());
    assert!(snapshot.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    for pair in snapshot.windows(2) {
        if pair[0].created_at == pair[1].created_at {
            assert!(pair[0].id < pair[1].id);
        }
    }
}

#[tokio::test]
async fn coordinator_rejects_overlapping_sends() {
    let store = Arc::new(GatedStore::new());
    let coordinator = Arc::new(SendCoordinator::with_clock(
        store.clone(),
        Arc::new(FixedClock::new(1)),
    ));

    let first = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.send("Alice", "one", "desktop").await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while !coordinator.is_in_flight() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    let second = coordinator.send("Alice", "two", "desktop").await;
    assert!(matches!(second, Err(SendError::InFlight)));

    store.release_one();
    first.await.unwrap().unwrap();
    assert!(!coordinator.is_in_flight());

    store.release_one();
    coordinator.send("Alice", "three", "desktop").await.unwrap();
    assert_eq!(store.inner.len(), 2);
}

#[tokio::test]
async fn session_ignores_send_while_in_flight() {
    let store = Arc::new(GatedStore::new());
    let session = PendingSession::new(store.clone(), "desktop")
        .enter_name("Alice")
        .unwrap();

    session.set_draft("hi").unwrap();
    session.request_send().unwrap();
    let view = wait_for(&session, |v| v.sending).await;
    assert!(!view.can_send);

    // Double click.
    session.request_send().unwrap();
    session.set_draft("hi again").unwrap();
    session.request_send().unwrap();

    // Commands are handled in order, so once the marker shows up both
    // extra requests have been seen and ignored.
    session.set_draft("marker").unwrap();
    wait_for(&session, |v| v.draft == "marker" && v.sending).await;

    store.release_one();
    let view = wait_for(&session, |v| v.messages.len() == 1 && !v.sending).await;
    assert_eq!(view.messages[0].content, "hi");
    assert!(view.draft.is_empty());

    // Nothing else was queued behind the gate.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.inner.len(), 1);
}

#[tokio::test]
async fn failed_send_never_appears_in_later_snapshots() {
    let store = Arc::new(MemoryStore::new());
    let alice = PendingSession::new(store.clone(), "desktop")
        .enter_name("Alice")
        .unwrap();
    let bob = PendingSession::new(store.clone(), "web")
        .enter_name("Bob")
        .unwrap();

    store.fail_next_appends(1);
    alice.set_draft("doomed").unwrap();
    alice.request_send().unwrap();
    let view = wait_for(&alice, |v| v.last_send_error.is_some()).await;
    assert!(!view.sending);
    assert!(view.draft.is_empty());

    bob.set_draft("still here").unwrap();
    bob.request_send().unwrap();

    let view = wait_for(&alice, |v| !v.messages.is_empty()).await;
    assert_eq!(view.messages.len(), 1);
    assert_eq!(view.messages[0].author, "Bob");
    assert!(view.messages.iter().all(|m| m.content != "doomed"));
}

#[tokio::test]
async fn skewed_clients_are_ordered_by_their_own_clocks() {
    let store = Arc::new(MemoryStore::new());
    let fast = PendingSession::new(store.clone(), "desktop")
        .with_clock(Arc::new(FixedClock::new(1_000)))
        .enter_name("Fast")
        .unwrap();
    let slow = PendingSession::new(store.clone(), "web")
        .with_clock(Arc::new(FixedClock::new(10)))
        .enter_name("Slow")
        .unwrap();

    fast.set_draft("sent first").unwrap();
    fast.request_send().unwrap();
    wait_for(&fast, |v| v.messages.len() == 1).await;

    slow.set_draft("sent second").unwrap();
    slow.request_send().unwrap();

    let view = wait_for(&fast, |v| v.messages.len() == 2).await;
    assert_eq!(view.messages[0].author, "Slow");
    assert_eq!(view.messages[1].author, "Fast");
    // Growth moves the cursor even when the new message sorts to the top.
    assert_eq!(view.scroll_to, Some(1));
    assert_eq!(view.scroll_seq, 2);
}

#[tokio::test]
async fn sessions_share_a_sqlite_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("murmur.db");

    let poll = Duration::from_millis(20);
    let store_a = Arc::new(SqliteStore::open(&path, poll).await.unwrap());
    let store_b = Arc::new(SqliteStore::open(&path, poll).await.unwrap());

    let alice = PendingSession::new(store_a, "desktop").enter_name("Alice").unwrap();
    let bob = PendingSession::new(store_b, "web").enter_name("Bob").unwrap();

    alice.set_draft("hello from a").unwrap();
    alice.request_send().unwrap();

    let view = wait_for(&bob, |v| v.messages.len() == 1).await;
    assert_eq!(view.messages[0].author, "Alice");
    assert_eq!(view.messages[0].platform, "desktop");

    alice.shutdown().await;
    bob.shutdown().await;
}
