//! Frames exchanged on the live chat channel.
//!
//! DESIGN
//! ======
//! Inbound frames are JSON text of two shapes:
//! - status frames: `{"system": true, "message": "..."}`
//! - chat frames: `{"id"?, "from", "content", "to"?, "sentAt"?}`
//!
//! The server also answers malformed sends with `{"error": "..."}`; those are
//! parsed as notices, never as chat. Anything else is a [`FrameError`] and
//! the session drops it.
//!
//! Outbound frames are `{"to", "content", "from"}`, plus `clientId` when
//! correlation ids are enabled.

use serde::Serialize;
use serde_json::Value;

use crate::identity::UserId;

/// Errors produced while parsing an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("missing expected field `{0}`")]
    MissingField(&'static str),
}

/// A parsed inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Chat(ChatFrame),
    /// `{system: true, message}` status notice (e.g. `connected`, `user-offline`).
    System { message: String },
    /// `{error}` reply to a rejected send.
    ServerError { message: String },
}

/// A chat message as delivered by the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatFrame {
    pub id: Option<String>,
    pub from: UserId,
    pub to: Option<UserId>,
    pub content: String,
    pub sent_at: Option<String>,
    /// Echo of the outbound `clientId`, when the server supports it.
    pub client_id: Option<String>,
}

/// A chat message sent by the local user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundFrame {
    pub to: UserId,
    pub content: String,
    pub from: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl OutboundFrame {
    /// Serialize to the JSON text sent over the socket.
    pub fn to_text(&self) -> Result<String, FrameError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Parse one inbound text frame.
pub fn parse_inbound(text: &str) -> Result<Inbound, FrameError> {
    let value: Value = serde_json::from_str(text)?;
    let Some(data) = value.as_object() else {
        return Err(FrameError::NotAnObject);
    };

    if data.get("system").and_then(Value::as_bool) == Some(true) {
        let message = data.get("message").and_then(text_value).unwrap_or_default();
        return Ok(Inbound::System { message });
    }

    if !data.contains_key("content") {
        if let Some(message) = data.get("error").and_then(text_value) {
            return Ok(Inbound::ServerError { message });
        }
    }

    let content = data
        .get("content")
        .and_then(Value::as_str)
        .ok_or(FrameError::MissingField("content"))?
        .to_owned();
    let from = data
        .get("from")
        .and_then(text_value)
        .map(UserId::new)
        .ok_or(FrameError::MissingField("from"))?;

    Ok(Inbound::Chat(ChatFrame {
        id: data.get("id").and_then(text_value),
        from,
        to: data.get("to").and_then(text_value).map(UserId::new),
        content,
        sent_at: data.get("sentAt").and_then(text_value),
        client_id: data.get("clientId").and_then(text_value),
    }))
}

/// Read a string-or-number JSON value as text. `null` and other shapes yield `None`.
pub(crate) fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
