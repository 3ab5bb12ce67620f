//! Client side of the shared chat log.
//!
//! - [`MessageStream`] turns store notifications into ordered snapshots
//! - [`SendCoordinator`] stamps outgoing messages and gates duplicate sends
//! - [`ChatSession`] ties both to one display name and a view model

pub mod clock;
pub mod cursor;
pub mod error;
pub mod ids;
pub mod send;
pub mod session;
pub mod stream;

pub use clock::{Clock, FixedClock, SystemClock};
pub use cursor::LatestCursor;
pub use error::{SendError, SessionError};
pub use ids::generate_message_id;
pub use send::{PendingSend, SendCompletion, SendCoordinator};
pub use session::{ChatSession, NameRejected, PendingSession, SessionView};
pub use stream::{MessageStream, Snapshot};
