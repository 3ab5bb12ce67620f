//! Document store boundary for the shared message log.
//!
//! A store holds one collection of `key -> body` documents. Clients observe
//! it through [`MessageStore::subscribe`], which always yields the complete
//! collection (never a diff), and write to it with [`MessageStore::append`],
//! an upsert keyed by a caller-chosen id. The store performs no uniqueness
//! check: a second append under the same key silently replaces the first.

pub mod error;
pub mod feed;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod sqlite;

use std::future::Future;

use murmur_types::MessageBody;

pub use error::StoreError;
pub use feed::{CollectionState, Subscription};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

pub trait MessageStore: Send + Sync + 'static {
    /// Start observing the collection. The returned subscription already
    /// holds the current state.
    fn subscribe(&self) -> Subscription;

    /// Write one document under `key`, replacing any existing document.
    fn append(
        &self,
        key: &str,
        body: &MessageBody,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
