//! WebSocket connector over `tokio-tungstenite`.
//!
//! The live channel carries the user id in the query string:
//! `<ws_url>?userId=<id>`. Only text frames are meaningful; pings are
//! answered by tungstenite and binary frames are ignored.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

use super::{Channel, ChannelEvent, Connector, TransportError};
use crate::config::ChatConfig;
use crate::identity::LocalUserId;

/// Production [`Connector`]: one WebSocket per connect attempt.
#[derive(Debug, Clone)]
pub struct WsConnector {
    ws_url: String,
    connect_timeout: Duration,
}

impl WsConnector {
    #[must_use]
    pub fn new(ws_url: impl Into<String>, connect_timeout: Duration) -> Self {
        Self { ws_url: ws_url.into(), connect_timeout }
    }

    #[must_use]
    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.ws_url.clone(), Duration::from_secs(config.timeouts.connect_secs))
    }

    /// The full URL for `user`, with the id percent-encoded.
    pub fn url_for(&self, user: &LocalUserId) -> Result<String, TransportError> {
        let url = reqwest::Url::parse_with_params(&self.ws_url, &[("userId", user.as_str())])
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", self.ws_url)))?;
        Ok(url.into())
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, user: &LocalUserId) -> Result<Box<dyn Channel>, TransportError> {
        let url = self.url_for(user)?;
        debug!(%url, "ws: connecting");
        let (stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::Connect(Box::new(e)))?;
        Ok(Box::new(WsChannel { stream }))
    }
}

struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Channel for WsChannel {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Socket(Box::new(e)))
    }

    async fn recv(&mut self) -> Result<ChannelEvent, TransportError> {
        loop {
            let Some(message) = self.stream.next().await else {
                return Ok(ChannelEvent::Closed { code: None, reason: String::new() });
            };
            match message.map_err(|e| TransportError::Socket(Box::new(e)))? {
                Message::Text(text) => return Ok(ChannelEvent::Text(text.as_str().to_owned())),
                Message::Close(frame) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.as_str().to_owned()),
                        None => (None, String::new()),
                    };
                    return Ok(ChannelEvent::Closed { code, reason });
                }
                _ => {}
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "ws: close handshake failed");
        }
    }
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
