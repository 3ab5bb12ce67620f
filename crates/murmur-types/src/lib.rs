pub mod document;
pub mod error;
pub mod models;
pub mod ordering;

pub use document::{Document, MessageBody};
pub use error::DecodeError;
pub use models::Message;
pub use ordering::order_messages;
