use std::cmp::Ordering;

use crate::models::Message;

/// Display order: ascending `created_at`, ties broken by ascending `id`.
///
/// Clocks on different clients are not synchronized, so callers must re-sort
/// the whole collection each time instead of trusting arrival order.
pub fn compare(a: &Message, b: &Message) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Put an unordered set of messages into display order.
pub fn order_messages(messages: impl IntoIterator<Item = Message>) -> Vec<Message> {
    let mut ordered: Vec<Message> = messages.into_iter().collect();
    ordered.sort_by(compare);
    ordered
}

pub fn is_ordered(messages: &[Message]) -> bool {
    messages
        .windows(2)
        .all(|pair| compare(&pair[0], &pair[1]) != Ordering::Greater)
}
