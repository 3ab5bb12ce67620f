use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use murmur_store::{MessageStore, StoreError};
use murmur_types::{Message, MessageBody};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::SendError;
use crate::ids::generate_message_id;

/// Builds outgoing messages and keeps one session from sending twice at once.
///
/// The in-flight flag is per coordinator, not per message, and gives no
/// protection across clients. Timestamps come from the local clock and ids
/// are generated locally; the store trusts both.
pub struct SendCoordinator<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    in_flight: Arc<AtomicBool>,
}

impl<S: MessageStore> SendCoordinator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether a send of `content` would be accepted right now.
    pub fn can_send(&self, content: &str) -> bool {
        !is_blank(content) && !self.is_in_flight()
    }

    /// Claim the in-flight slot and stamp a message with id and timestamp.
    ///
    /// Nothing is written until [`PendingSend::submit`]. The slot stays
    /// claimed until the returned value, or the completion it turns into, is
    /// dropped.
    pub fn begin(
        &self,
        author: &str,
        content: &str,
        platform: &str,
    ) -> Result<PendingSend<S>, SendError> {
        if is_blank(content) {
            return Err(SendError::BlankContent);
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SendError::InFlight);
        }
        let guard = InFlightGuard {
            flag: self.in_flight.clone(),
        };

        let created_at = self.clock.now_secs();
        let message =
            Message::new(author, content, created_at, platform).with_id(generate_message_id());

        Ok(PendingSend {
            store: self.store.clone(),
            message,
            guard,
        })
    }

    /// Send one message and wait for the append to finish.
    ///
    /// The message itself is not returned: it becomes visible only through
    /// the next snapshot that contains it.
    pub async fn send(&self, author: &str, content: &str, platform: &str) -> Result<(), SendError> {
        let pending = self.begin(author, content, platform)?;
        pending.submit().await.finish().map_err(SendError::Append)
    }
}

fn is_blank(content: &str) -> bool {
    content.trim().is_empty()
}

/// Clears the in-flight flag when dropped, whatever happened to the append.
struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// A stamped message holding the in-flight slot, not yet written.
pub struct PendingSend<S> {
    store: Arc<S>,
    message: Message,
    guard: InFlightGuard,
}

impl<S: MessageStore> PendingSend<S> {
    /// Append the message under its generated id.
    pub async fn submit(self) -> SendCompletion {
        let body = MessageBody::from(&self.message);
        let result = self.store.append(&self.message.id, &body).await;

        match &result {
            Ok(()) => debug!(
                "Appended message {} from {} (created_at {})",
                self.message.id, self.message.author, self.message.created_at
            ),
            Err(e) => warn!("Append of message {} failed: {}", self.message.id, e),
        }

        SendCompletion {
            result,
            _guard: self.guard,
        }
    }
}

/// Outcome of an append. Still holds the in-flight slot, so the owner can
/// finish its own bookkeeping before another send is let through.
pub struct SendCompletion {
    result: Result<(), StoreError>,
    _guard: InFlightGuard,
}

impl SendCompletion {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Release the in-flight slot and hand back the append result.
    pub fn finish(self) -> Result<(), StoreError> {
        self.result
    }
}
