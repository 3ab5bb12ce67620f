use chrono::{DateTime, SecondsFormat};
use murmur_client::SessionView;
use murmur_types::Message;

/// Text form of one message: author and body, then timestamp and platform.
pub fn format_message(message: &Message) -> String {
    let timestamp = DateTime::from_timestamp(message.created_at, 0)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| message.created_at.to_string());

    format!(
        "{} : {}\n    {}   {}",
        message.author, message.content, timestamp, message.platform
    )
}

/// Prints snapshots as they change.
///
/// The terminal cannot redraw in place, so while the log only grows at the
/// end just the new tail is printed. Anything else (a message from a lagging
/// clock landing mid-log) reprints the whole log.
#[derive(Debug, Default)]
pub struct Renderer {
    shown: Vec<String>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines to print for `view`, or `None` if nothing visible changed.
    pub fn update(&mut self, view: &SessionView) -> Option<String> {
        let ids: Vec<String> = view.messages.iter().map(|m| m.id.clone()).collect();
        if ids == self.shown {
            return None;
        }

        let appended_only = ids.len() > self.shown.len() && ids.starts_with(&self.shown);
        let start = if appended_only { self.shown.len() } else { 0 };

        let mut out = String::new();
        if !appended_only && !self.shown.is_empty() {
            out.push_str("---- conversation reordered ----\n");
        }
        for message in &view.messages[start..] {
            out.push_str(&format_message(message));
            out.push('\n');
        }

        self.shown = ids;
        Some(out)
    }
}
