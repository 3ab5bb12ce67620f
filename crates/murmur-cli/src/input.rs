use anyhow::Result;
use murmur_client::{ChatSession, PendingSession, SendError, SessionError};
use murmur_store::MessageStore;
use tokio::io::{AsyncBufRead, Lines};
use tracing::{info, warn};

/// Ask for a display name until a non-empty one is given. `None` on EOF.
pub async fn prompt_name<S, R>(
    mut pending: PendingSession<S>,
    lines: &mut Lines<R>,
) -> Result<Option<ChatSession>>
where
    S: MessageStore,
    R: AsyncBufRead + Unpin,
{
    loop {
        println!("Enter your name:");
        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };

        match pending.enter_name(line) {
            Ok(session) => return Ok(Some(session)),
            Err(rejected) => {
                println!("{}", rejected);
                pending = rejected.into_pending();
            }
        }
    }
}

/// Every non-blank line becomes the draft and is sent. The next line is only
/// read once the previous send has settled, so typed-ahead input is queued
/// rather than dropped.
pub async fn input_loop<R>(session: &ChatSession, lines: &mut Lines<R>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    println!("Joined as {}. Type a message and press Enter.", session.author());

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        match session.submit(line).await {
            Ok(()) => {}
            // Shown by the render loop through `last_send_error`
            Err(SessionError::Send(SendError::Append(_))) => {}
            Err(SessionError::Send(e)) => warn!("Message not sent: {}", e),
            Err(e) => return Err(e.into()),
        }
    }

    info!("Input closed, leaving chat");
    Ok(())
}
