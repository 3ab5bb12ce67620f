use std::sync::Arc;

use futures_util::Stream;
use murmur_store::{CollectionState, MessageStore, Subscription};
use murmur_types::{Message, order_messages};
use tracing::{debug, warn};

/// The whole message log, in display order.
pub type Snapshot = Arc<[Message]>;

/// Turns store notifications into a sequence of ordered snapshots.
///
/// Every item is the complete current log; consumers replace their view
/// instead of patching it. While the store is suspended nothing is emitted.
/// Notifications that arrive faster than they are read collapse into the
/// newest one.
pub struct MessageStream {
    subscription: Subscription,
    primed: bool,
}

impl MessageStream {
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            primed: false,
        }
    }

    pub fn from_store<S: MessageStore>(store: &S) -> Self {
        Self::new(store.subscribe())
    }

    /// Wait for the next snapshot. The first call returns the current log
    /// immediately unless the store is suspended. `None` once the store is
    /// gone.
    pub async fn next_snapshot(&mut self) -> Option<Snapshot> {
        if !self.primed {
            self.primed = true;
            let state = self.subscription.current();
            if let Some(snapshot) = materialize(&state) {
                return Some(snapshot);
            }
        }

        loop {
            let state = self.subscription.changed().await?;
            if let Some(snapshot) = materialize(&state) {
                return Some(snapshot);
            }
        }
    }

    pub fn into_stream(mut self) -> impl Stream<Item = Snapshot> {
        async_stream::stream! {
            while let Some(snapshot) = self.next_snapshot().await {
                yield snapshot;
            }
        }
    }
}

/// Decode and order one collection state.
///
/// A document that does not decode is dropped on its own; the remaining
/// messages still make up the snapshot.
pub fn materialize(state: &CollectionState) -> Option<Snapshot> {
    let documents = match state {
        CollectionState::Live(documents) => documents,
        CollectionState::Suspended { reason } => {
            debug!("Store suspended ({}), holding last snapshot", reason);
            return None;
        }
    };

    let messages = documents.iter().filter_map(|doc| match doc.decode() {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!("Dropping undecodable document: {}", e);
            None
        }
    });

    let ordered = order_messages(messages);
    debug!("Snapshot of {} messages", ordered.len());
    Some(ordered.into())
}
