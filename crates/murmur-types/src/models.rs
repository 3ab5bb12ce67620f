use serde::{Deserialize, Serialize};

/// One chat entry.
///
/// `id` and `created_at` are both assigned by the sending client, never by the
/// store. A freshly built message carries an empty `id` until the send path
/// stamps it with a generated key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: String,
    pub author: String,
    pub content: String,
    /// Seconds since the Unix epoch, read from the sender's wall clock.
    pub created_at: i64,
    pub platform: String,
}

impl Message {
    /// Build a message that has not been assigned an id yet.
    pub fn new(
        author: impl Into<String>,
        content: impl Into<String>,
        created_at: i64,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            author: author.into(),
            content: content.into(),
            created_at,
            platform: platform.into(),
        }
    }

    /// Same message under a different key.
    pub fn with_id(self, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..self
        }
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }
}
