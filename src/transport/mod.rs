//! Transport session: one live duplex channel per local user.
//!
//! ARCHITECTURE
//! ============
//! - `machine`: pure state machine (`Connecting/Open/Reconnecting/Closed`).
//!   It decides transitions and actions; it never touches I/O.
//! - `session`: the async driver task plus the cloneable [`TransportSession`]
//!   handle. The driver applies machine actions: connect, arm the single
//!   reconnect timer, release the channel.
//! - `ws`: the WebSocket [`Connector`] used in production.
//!
//! The [`Connector`] / [`Channel`] traits are the seam that lets tests drive
//! the session with in-memory channels.

mod machine;
mod session;
mod ws;

use async_trait::async_trait;

use crate::identity::LocalUserId;

pub use machine::{Action, SessionEvent, SessionMachine, SessionState, StatusLine, Transition};
pub use session::{SendStatus, SessionOptions, TransportSession};
pub use ws::WsConnector;

/// Errors produced by connectors and channels.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid live-channel URL: {0}")]
    InvalidUrl(String),

    #[error("websocket connect failed: {0}")]
    Connect(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("timed out connecting to live channel")]
    Timeout,

    #[error("websocket error: {0}")]
    Socket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error("connection refused: {0}")]
    Refused(String),
}

/// One event read from an open channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Text(String),
    /// The remote side closed the channel (or the stream ended).
    Closed { code: Option<u16>, reason: String },
}

/// Opens live channels for a user.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, user: &LocalUserId) -> Result<Box<dyn Channel>, TransportError>;
}

/// An open duplex text channel.
///
/// `recv` must be cancel-safe: the session polls it inside `select!`.
#[async_trait]
pub trait Channel: Send {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    async fn recv(&mut self) -> Result<ChannelEvent, TransportError>;

    /// Close the channel from the local side.
    async fn close(&mut self);
}
