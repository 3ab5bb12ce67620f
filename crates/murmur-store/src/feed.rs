use std::sync::Arc;

use murmur_types::Document;
use tokio::sync::watch;

/// What a subscriber currently knows about the collection.
#[derive(Debug, Clone)]
pub enum CollectionState {
    /// Every document in the collection, in no particular order.
    Live(Arc<[Document]>),
    /// The store lost connectivity; the last `Live` state may be stale.
    Suspended { reason: String },
}

impl CollectionState {
    pub fn documents(&self) -> Option<&[Document]> {
        match self {
            Self::Live(docs) => Some(&docs[..]),
            Self::Suspended { .. } => None,
        }
    }
}

/// Receiving end of a store subscription.
///
/// Only the most recent state is retained, so a slow reader skips straight
/// to the newest collection instead of replaying every intermediate one.
pub struct Subscription {
    rx: watch::Receiver<CollectionState>,
}

impl Subscription {
    pub(crate) fn new(rx: watch::Receiver<CollectionState>) -> Self {
        Self { rx }
    }

    /// The state as of now, marking it seen.
    pub fn current(&mut self) -> CollectionState {
        self.rx.borrow_and_update().clone()
    }

    /// Wait for the next state. Returns `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<CollectionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Publishing side shared by the concrete stores.
pub(crate) struct Feed {
    tx: watch::Sender<CollectionState>,
}

impl Feed {
    pub(crate) fn new(initial: Vec<Document>) -> Self {
        let (tx, _) = watch::channel(CollectionState::Live(initial.into()));
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> Subscription {
        Subscription::new(self.tx.subscribe())
    }

    pub(crate) fn publish_live(&self, documents: Vec<Document>) {
        self.tx.send_replace(CollectionState::Live(documents.into()));
    }

    pub(crate) fn publish_suspended(&self, reason: impl Into<String>) {
        self.tx.send_replace(CollectionState::Suspended {
            reason: reason.into(),
        });
    }

    pub(crate) fn is_suspended(&self) -> bool {
        matches!(*self.tx.borrow(), CollectionState::Suspended { .. })
    }
}
