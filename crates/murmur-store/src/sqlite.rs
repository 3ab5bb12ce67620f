use std::path::Path;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use anyhow::{Result, anyhow};
use murmur_types::{Document, MessageBody};
use rusqlite::Connection;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::feed::{Feed, Subscription};
use crate::{MessageStore, migrations, queries};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL lets other processes keep reading while one of them appends
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations::run(&conn)?;

        info!("Document store opened at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrations::run(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
        f(&conn)
    }
}

/// Durable document collection backed by a SQLite file.
///
/// Several processes may open the same file. Writes made through this handle
/// are published to subscribers right away; writes made by other processes
/// are picked up by a background watcher polling `PRAGMA data_version`.
#[derive(Clone)]
pub struct SqliteStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    db: Database,
    feed: Feed,
}

impl StoreInner {
    /// Re-read the whole collection and publish it.
    ///
    /// Reading and publishing happen under the connection lock, so
    /// subscribers never see an older collection after a newer one.
    fn refresh(&self) -> Result<()> {
        self.db.with_conn(|conn| {
            let documents = load_documents(conn)?;
            debug!("Publishing {} documents", documents.len());
            self.feed.publish_live(documents);
            Ok(())
        })
    }

    fn upsert(&self, key: &str, body: &str) -> Result<()> {
        self.db.with_conn(|conn| {
            queries::upsert_document(conn, key, body)?;
            let documents = load_documents(conn)?;
            self.feed.publish_live(documents);
            Ok(())
        })
    }

    /// Refresh if the file changed since `last_version`.
    fn poll(&self, last_version: Option<i64>) -> Result<i64> {
        let version = self.db.data_version()?;
        if last_version != Some(version) {
            self.refresh()?;
        }
        Ok(version)
    }
}

fn load_documents(conn: &Connection) -> Result<Vec<Document>> {
    Ok(queries::query_documents(conn)?
        .into_iter()
        .map(|row| row.into_document())
        .collect())
}

impl SqliteStore {
    /// Open (or create) the store at `path` and start watching it for writes
    /// from other processes. Must be called inside a Tokio runtime.
    pub async fn open(path: impl AsRef<Path>, poll_interval: Duration) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let db = tokio::task::spawn_blocking(move || Database::open(&path)).await??;
        Self::start(db, poll_interval).await
    }

    /// Private, non-shared store. Mostly useful in tests.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        let db = Database::open_in_memory()?;
        Self::start(db, DEFAULT_POLL_INTERVAL).await
    }

    async fn start(db: Database, poll_interval: Duration) -> Result<Self, StoreError> {
        let inner = Arc::new(StoreInner {
            db,
            feed: Feed::new(Vec::new()),
        });

        let initial = inner.clone();
        let version = tokio::task::spawn_blocking(move || initial.poll(None)).await??;

        tokio::spawn(watch_for_changes(
            Arc::downgrade(&inner),
            version,
            poll_interval,
        ));

        Ok(Self { inner })
    }
}

impl MessageStore for SqliteStore {
    fn subscribe(&self) -> Subscription {
        self.inner.feed.subscribe()
    }

    async fn append(&self, key: &str, body: &MessageBody) -> Result<(), StoreError> {
        let json = serde_json::to_string(body)?;
        let inner = self.inner.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || inner.upsert(&key, &json)).await??;
        Ok(())
    }
}

/// Background loop noticing commits from other connections.
///
/// A failed poll marks the feed suspended; the next successful one forces a
/// full refresh, which also lifts the suspension. Exits once the store is
/// dropped.
async fn watch_for_changes(inner: Weak<StoreInner>, initial_version: i64, poll_interval: Duration) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await;

    let mut last_version = Some(initial_version);

    loop {
        interval.tick().await;

        let Some(store) = inner.upgrade() else {
            debug!("Document store dropped, stopping watcher");
            break;
        };

        let result = tokio::task::spawn_blocking(move || {
            let outcome = store.poll(last_version);
            if let Err(e) = &outcome {
                if !store.feed.is_suspended() {
                    store.feed.publish_suspended(format!("{:#}", e));
                }
            }
            outcome
        })
        .await;

        match result {
            Ok(Ok(version)) => {
                if last_version.is_none() {
                    info!("Document store reachable again");
                }
                last_version = Some(version);
            }
            Ok(Err(e)) => {
                if last_version.is_some() {
                    warn!("Document store poll failed, suspending feed: {:#}", e);
                }
                last_version = None;
            }
            Err(e) => {
                warn!("Document store watcher task failed: {}", e);
                last_version = None;
            }
        }
    }
}
