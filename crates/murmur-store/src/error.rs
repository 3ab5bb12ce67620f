use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0:#}")]
    Database(#[from] anyhow::Error),

    #[error("failed to encode document body: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("store task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
