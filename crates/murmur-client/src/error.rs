use murmur_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SendError {
    #[error("message content is blank")]
    BlankContent,

    #[error("a send is already in flight")]
    InFlight,

    #[error("append failed: {0}")]
    Append(#[source] StoreError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("chat session has shut down")]
    Closed,

    #[error(transparent)]
    Send(#[from] SendError),
}
