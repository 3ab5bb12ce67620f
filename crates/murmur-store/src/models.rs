use murmur_types::Document;
use serde_json::Value;
use tracing::warn;

/// A row of the `documents` table.
/// Kept separate from [`Document`] so the SQLite layer does not depend on JSON.
pub struct DocumentRow {
    pub key: String,
    pub body: String,
    pub written_at: String,
}

impl DocumentRow {
    /// Bodies that are not valid JSON are passed through as a JSON string so
    /// the decode step downstream rejects just that document.
    pub fn into_document(self) -> Document {
        let body = serde_json::from_str(&self.body).unwrap_or_else(|e| {
            warn!("Document '{}' has a non-JSON body: {}", self.key, e);
            Value::String(self.body)
        });
        Document::new(self.key, body)
    }
}
