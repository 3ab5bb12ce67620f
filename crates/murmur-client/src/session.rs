use std::fmt;
use std::sync::Arc;

use murmur_store::MessageStore;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::cursor::LatestCursor;
use crate::error::{SendError, SessionError};
use crate::send::{SendCompletion, SendCoordinator};
use crate::stream::{MessageStream, Snapshot};

/// What the presentation layer renders.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub author: String,
    /// Latest ordered snapshot of the log.
    pub messages: Snapshot,
    pub draft: String,
    /// A send is in flight.
    pub sending: bool,
    /// Draft is non-blank and nothing is in flight.
    pub can_send: bool,
    /// Index of the newest message, updated whenever the log grows.
    pub scroll_to: Option<usize>,
    /// Bumped on every scroll request so repeated requests are distinguishable.
    pub scroll_seq: u64,
    /// Error from the most recent failed append, cleared by the next success.
    pub last_send_error: Option<String>,
}

/// A session that has not been given a display name yet.
pub struct PendingSession<S> {
    store: Arc<S>,
    platform: String,
    clock: Arc<dyn Clock>,
}

impl<S: MessageStore> PendingSession<S> {
    pub fn new(store: Arc<S>, platform: impl Into<String>) -> Self {
        Self {
            store,
            platform: platform.into(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Join the chat as `name`. The name is fixed for the session's lifetime.
    ///
    /// Only an empty name is rejected; no other validation happens. The
    /// rejection hands the pending session back so the caller can ask again.
    /// Must be called inside a Tokio runtime.
    pub fn enter_name(self, name: impl Into<String>) -> Result<ChatSession, NameRejected<S>> {
        let name = name.into();
        if name.is_empty() {
            return Err(NameRejected { pending: self });
        }

        info!("{} joined the chat from {}", name, self.platform);

        let stream = MessageStream::from_store(self.store.as_ref());
        let coordinator = SendCoordinator::with_clock(self.store.clone(), self.clock.clone());
        let state = SessionState {
            author: name.clone(),
            platform: self.platform.clone(),
            messages: Vec::new().into(),
            draft: String::new(),
            cursor: LatestCursor::new(),
            scroll_to: None,
            last_send_error: None,
            pending_reply: None,
            coordinator,
        };

        let (view_tx, view_rx) = watch::channel(state.view());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_session(state, stream, command_rx, view_tx));

        Ok(ChatSession {
            author: name,
            commands: command_tx,
            view: view_rx,
            task,
        })
    }
}

/// An empty display name. Still awaiting a name.
#[derive(Error)]
#[error("display name must not be empty")]
pub struct NameRejected<S> {
    pending: PendingSession<S>,
}

impl<S> NameRejected<S> {
    pub fn into_pending(self) -> PendingSession<S> {
        self.pending
    }
}

impl<S> fmt::Debug for NameRejected<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameRejected")
            .field("platform", &self.pending.platform)
            .finish()
    }
}

type SendReply = oneshot::Sender<Result<(), SendError>>;
type SendAnswer = (SendReply, Result<(), SendError>);

#[derive(Debug)]
enum SessionCommand {
    SetDraft(String),
    Send(Option<SendReply>),
}

/// Handle to an active chat session.
///
/// All session state lives in one background task; the handle only sends it
/// commands and reads the published [`SessionView`]. Dropping the handle ends
/// the task and detaches the store subscription. Appends already in flight
/// still run to completion.
pub struct ChatSession {
    author: String,
    commands: mpsc::UnboundedSender<SessionCommand>,
    view: watch::Receiver<SessionView>,
    task: JoinHandle<()>,
}

impl ChatSession {
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Receiver for view updates, for consumers that render on change.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// The view as last published.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Replace the input buffer.
    pub fn set_draft(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.command(SessionCommand::SetDraft(text.into()))
    }

    /// Send the current draft. Ignored if it is blank or a send is in flight.
    pub fn request_send(&self) -> Result<(), SessionError> {
        self.command(SessionCommand::Send(None))
    }

    /// Put `text` in the input buffer, send it, and wait until the append
    /// has finished and the in-flight slot is free again.
    ///
    /// A blank `text`, a send already in flight, or a failed append come
    /// back as [`SessionError::Send`].
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command(SessionCommand::SetDraft(text.into()))?;
        self.command(SessionCommand::Send(Some(reply_tx)))?;
        reply_rx.await.map_err(|_| SessionError::Closed)??;
        Ok(())
    }

    fn command(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }

    /// Stop the session and wait for its task to wind down.
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            warn!("Chat session task ended abnormally: {}", e);
        }
    }
}

struct SessionState<S> {
    author: String,
    platform: String,
    messages: Snapshot,
    draft: String,
    cursor: LatestCursor,
    scroll_to: Option<usize>,
    last_send_error: Option<String>,
    /// Caller waiting on the send currently in flight, if any.
    pending_reply: Option<SendReply>,
    coordinator: SendCoordinator<S>,
}

impl<S: MessageStore> SessionState<S> {
    fn view(&self) -> SessionView {
        SessionView {
            author: self.author.clone(),
            messages: self.messages.clone(),
            draft: self.draft.clone(),
            sending: self.coordinator.is_in_flight(),
            can_send: self.coordinator.can_send(&self.draft),
            scroll_to: self.scroll_to,
            scroll_seq: self.cursor.seq(),
            last_send_error: self.last_send_error.clone(),
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        match self.cursor.observe(snapshot.len()) {
            Some(index) => self.scroll_to = Some(index),
            // A shrinking log must not leave the index past its end.
            None => self.scroll_to = self.scroll_to.min(self.cursor.latest_index()),
        }
        self.messages = snapshot;
    }

    /// Returns the waiting caller, if any, and what to tell it.
    fn finish_send(&mut self, completion: SendCompletion) -> Option<SendAnswer> {
        // The draft goes whether or not the append landed.
        self.draft.clear();
        let result = match completion.finish() {
            Ok(()) => {
                self.last_send_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("Message from {} was not delivered: {}", self.author, e);
                self.last_send_error = Some(e.to_string());
                Err(SendError::Append(e))
            }
        };
        self.pending_reply.take().map(|reply| (reply, result))
    }
}

async fn run_session<S: MessageStore>(
    mut state: SessionState<S>,
    mut stream: MessageStream,
    mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    view_tx: watch::Sender<SessionView>,
) {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<SendCompletion>();
    let mut stream_open = true;

    loop {
        // Answered only after the view reflecting the outcome is published.
        let mut answer: Option<SendAnswer> = None;

        tokio::select! {
            snapshot = stream.next_snapshot(), if stream_open => {
                match snapshot {
                    Some(snapshot) => state.apply_snapshot(snapshot),
                    None => {
                        warn!("Message store closed, no further snapshots");
                        stream_open = false;
                    }
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    break;
                };
                match command {
                    SessionCommand::SetDraft(text) => state.draft = text,
                    SessionCommand::Send(reply) => {
                        match state.coordinator.begin(&state.author, &state.draft, &state.platform) {
                            Ok(pending) => {
                                state.pending_reply = reply;
                                let done_tx = done_tx.clone();
                                tokio::spawn(async move {
                                    let completion = pending.submit().await;
                                    // Session gone: dropping the completion frees the slot.
                                    let _ = done_tx.send(completion);
                                });
                            }
                            Err(e) => {
                                debug!("Send request ignored: {}", e);
                                answer = reply.map(|reply| (reply, Err(e)));
                            }
                        }
                    }
                }
            }
            Some(completion) = done_rx.recv() => answer = state.finish_send(completion),
        }

        view_tx.send_replace(state.view());

        if let Some((reply, result)) = answer {
            let _ = reply.send(result);
        }
    }

    info!("{} left the chat", state.author);
}
