use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The document body does not fit the message schema.
    #[error("document '{key}' does not match the message schema: {source}")]
    Schema {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    pub fn key(&self) -> &str {
        match self {
            Self::Schema { key, .. } => key,
        }
    }
}
