use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DecodeError;
use crate::models::Message;

/// Serialized form of a message as it is written into the document store.
///
/// The key the document is stored under is the authority for `id`, so the
/// body does not carry one. Extra fields in stored bodies (older clients wrote
/// `id` into the body too) are ignored when decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBody {
    pub author: String,
    pub content: String,
    pub created_at: i64,
    pub platform: String,
}

impl From<&Message> for MessageBody {
    fn from(msg: &Message) -> Self {
        Self {
            author: msg.author.clone(),
            content: msg.content.clone(),
            created_at: msg.created_at,
            platform: msg.platform.clone(),
        }
    }
}

impl MessageBody {
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn into_message(self, id: impl Into<String>) -> Message {
        Message {
            id: id.into(),
            author: self.author,
            content: self.content,
            created_at: self.created_at,
            platform: self.platform,
        }
    }
}

/// One entry of the store's collection: its key and its raw, undecoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub body: Value,
}

impl Document {
    pub fn new(key: impl Into<String>, body: Value) -> Self {
        Self {
            key: key.into(),
            body,
        }
    }

    /// Decode the body into a [`Message`], taking `id` from the document key.
    pub fn decode(&self) -> Result<Message, DecodeError> {
        let body = MessageBody::deserialize(&self.body).map_err(|source| DecodeError::Schema {
            key: self.key.clone(),
            source,
        })?;
        Ok(body.into_message(self.key.clone()))
    }
}
