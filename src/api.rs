//! REST client for the chat history and conversation-list endpoints.
//!
//! ERROR HANDLING
//! ==============
//! Every call returns `Result<_, ApiError>`. Callers in the core treat all
//! variants as transient: the directory keeps its stale list and the
//! controller seeds an empty transcript.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::config::HttpTimeouts;
use crate::directory::{Conversation, parse_conversations};
use crate::identity::{LocalUserId, PeerId};
use crate::message::{Message, parse_history};

pub const HISTORY_PATH: &str = "/api/chat/history";
pub const CONVERSATIONS_PATH: &str = "/api/chat/conversations";

/// Errors produced by REST calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

/// The two read endpoints the chat core consumes.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `GET /api/chat/history?userA=<local>&userB=<peer>`
    async fn history(&self, local: &LocalUserId, peer: &PeerId) -> Result<Vec<Message>, ApiError>;

    /// `GET /api/chat/conversations?userId=<local>`
    async fn conversations(&self, local: &LocalUserId) -> Result<Vec<Conversation>, ApiError>;
}

/// [`ChatApi`] over HTTP with an optional bearer credential.
pub struct HttpChatApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpChatApi {
    pub fn new(base_url: &str, token: Option<String>, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned(), token })
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.get(&url).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(%url, status = status.as_u16(), error = %e, "api: error body unreadable");
                    String::new()
                }
            };
            return Err(ApiError::Status { status: status.as_u16(), body });
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn history(&self, local: &LocalUserId, peer: &PeerId) -> Result<Vec<Message>, ApiError> {
        let body = self
            .get_json(HISTORY_PATH, &[("userA", local.as_str()), ("userB", peer.as_str())])
            .await?;
        Ok(parse_history(&body))
    }

    async fn conversations(&self, local: &LocalUserId) -> Result<Vec<Conversation>, ApiError> {
        let body = self
            .get_json(CONVERSATIONS_PATH, &[("userId", local.as_str())])
            .await?;
        Ok(parse_conversations(&body))
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
