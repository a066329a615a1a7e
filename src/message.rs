//! Transcript entries and their three sources: history, live frames, and
//! optimistic local sends.

use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

use crate::frame::{ChatFrame, text_value};
use crate::identity::UserId;

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Server identifier. Absent until the server has confirmed the message.
    pub id: Option<String>,
    /// Ephemeral key for locally created entries (`temp-<uuid>`).
    pub local_key: Option<String>,
    pub from: UserId,
    pub content: String,
    pub sent_at: Option<String>,
    pub pending: bool,
}

impl Message {
    /// An optimistic entry for a message the local user just sent.
    #[must_use]
    pub fn pending(from: UserId, content: impl Into<String>) -> Self {
        Self {
            id: None,
            local_key: Some(new_local_key()),
            from,
            content: content.into(),
            sent_at: Some(now_timestamp()),
            pending: true,
        }
    }

    /// A confirmed entry built from a live chat frame.
    #[must_use]
    pub fn from_frame(frame: &ChatFrame) -> Self {
        Self {
            id: frame.id.clone(),
            local_key: None,
            from: frame.from.clone(),
            content: frame.content.clone(),
            sent_at: frame.sent_at.clone(),
            pending: false,
        }
    }

    /// Normalize one history item: `{id, sender: {id} | from, content, sentAt}`.
    ///
    /// Returns `None` when the item is not an object or has no text content.
    #[must_use]
    pub fn from_history_value(item: &Value) -> Option<Self> {
        let data = item.as_object()?;
        let content = data.get("content").and_then(Value::as_str)?.to_owned();
        let from = data
            .get("sender")
            .and_then(|sender| sender.get("id"))
            .and_then(text_value)
            .or_else(|| data.get("from").and_then(text_value))
            .unwrap_or_default();

        Some(Self {
            id: data.get("id").and_then(text_value),
            local_key: None,
            from: UserId::new(from),
            content,
            sent_at: data.get("sentAt").and_then(text_value),
            pending: false,
        })
    }

    /// Stable key for rendering: server id when known, else the local key.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.id.as_deref().or(self.local_key.as_deref())
    }
}

/// Normalize a history response body. Malformed items are dropped and logged.
#[must_use]
pub fn parse_history(body: &Value) -> Vec<Message> {
    let Some(items) = body.as_array() else {
        if !body.is_null() {
            warn!("history: response is not an array; treating as empty");
        }
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let msg = Message::from_history_value(item);
            if msg.is_none() {
                warn!(index, "history: dropping malformed item");
            }
            msg
        })
        .collect()
}

fn new_local_key() -> String {
    format!("temp-{}", uuid::Uuid::new_v4())
}

/// Current UTC time as RFC 3339 text.
pub(crate) fn now_timestamp() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
