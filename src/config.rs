//! Chat configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8087";
pub const WS_CHAT_PATH: &str = "/ws/chat";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
pub const DEFAULT_ADMIN_PEER_ID: &str = "ADMIN";
pub const DEFAULT_ADMIN_PEER_NAME: &str = "Admin";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Errors produced while building a [`ChatConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// The well-known administrator peer injected into every directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPeer {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// HTTP origin of the backend, without trailing slash.
    pub base_url: String,
    /// Full live-channel URL, without the `userId` query parameter.
    pub ws_url: String,
    pub reconnect_delay: Duration,
    pub poll_interval: Duration,
    pub admin: AdminPeer,
    pub timeouts: HttpTimeouts,
    /// Capacity of the per-session inbound broadcast buffer.
    pub event_capacity: usize,
    /// Opt-in: tag outbound frames with the pending entry's local key.
    pub correlation_ids: bool,
}

impl ChatConfig {
    /// Defaults pointed at the given backend origin.
    pub fn for_base_url(base_url: &str) -> Result<Self, ConfigError> {
        let base_url = base_url.trim_end_matches('/').to_owned();
        let ws_url = ws_url(&base_url)?;
        Ok(Self { base_url, ws_url, ..Self::default() })
    }

    /// Build typed chat config from environment variables.
    ///
    /// Optional:
    /// - `CHAT_BASE_URL`: default `http://localhost:8087`
    /// - `CHAT_WS_URL`: derived from the base URL when absent
    /// - `CHAT_RECONNECT_DELAY_MS`: default 5000
    /// - `CHAT_POLL_INTERVAL_MS`: default 3000
    /// - `CHAT_ADMIN_PEER_ID` / `CHAT_ADMIN_PEER_NAME`: default `ADMIN` / `Admin`
    /// - `CHAT_REQUEST_TIMEOUT_SECS`: default 30
    /// - `CHAT_CONNECT_TIMEOUT_SECS`: default 10
    /// - `CHAT_EVENT_CAPACITY`: default 256
    /// - `CHAT_CORRELATION_IDS`: default false
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ChatConfig::from_env`], reading values through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = var("CHAT_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let mut config = Self::for_base_url(base_url.trim())?;

        if let Some(ws) = var("CHAT_WS_URL") {
            let ws = ws.trim().trim_end_matches('/').to_owned();
            if !(ws.starts_with("ws://") || ws.starts_with("wss://")) {
                return Err(ConfigError::InvalidValue { var: "CHAT_WS_URL", value: ws });
            }
            config.ws_url = ws;
        }

        config.reconnect_delay = Duration::from_millis(parse_u64(
            "CHAT_RECONNECT_DELAY_MS",
            var("CHAT_RECONNECT_DELAY_MS"),
            DEFAULT_RECONNECT_DELAY_MS,
        )?);
        config.poll_interval = Duration::from_millis(parse_nonzero(
            "CHAT_POLL_INTERVAL_MS",
            var("CHAT_POLL_INTERVAL_MS"),
            DEFAULT_POLL_INTERVAL_MS,
        )?);

        if let Some(id) = var("CHAT_ADMIN_PEER_ID") {
            config.admin.id = id.trim().to_owned();
        }
        if let Some(name) = var("CHAT_ADMIN_PEER_NAME") {
            config.admin.name = name.trim().to_owned();
        }

        config.timeouts = HttpTimeouts {
            request_secs: parse_nonzero(
                "CHAT_REQUEST_TIMEOUT_SECS",
                var("CHAT_REQUEST_TIMEOUT_SECS"),
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?,
            connect_secs: parse_nonzero(
                "CHAT_CONNECT_TIMEOUT_SECS",
                var("CHAT_CONNECT_TIMEOUT_SECS"),
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?,
        };

        let capacity = parse_nonzero("CHAT_EVENT_CAPACITY", var("CHAT_EVENT_CAPACITY"), DEFAULT_EVENT_CAPACITY as u64)?;
        config.event_capacity = usize::try_from(capacity)
            .map_err(|_| ConfigError::InvalidValue { var: "CHAT_EVENT_CAPACITY", value: capacity.to_string() })?;

        config.correlation_ids = parse_bool("CHAT_CORRELATION_IDS", var("CHAT_CORRELATION_IDS"))?;

        Ok(config)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            ws_url: format!("ws://localhost:8087{WS_CHAT_PATH}"),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            admin: AdminPeer { id: DEFAULT_ADMIN_PEER_ID.to_owned(), name: DEFAULT_ADMIN_PEER_NAME.to_owned() },
            timeouts: HttpTimeouts {
                request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            },
            event_capacity: DEFAULT_EVENT_CAPACITY,
            correlation_ids: false,
        }
    }
}

/// Derive the live-channel URL from an HTTP origin.
pub fn ws_url(base_url: &str) -> Result<String, ConfigError> {
    let base_url = base_url.trim_end_matches('/');
    if let Some(rest) = base_url.strip_prefix("http://") {
        return Ok(format!("ws://{rest}{WS_CHAT_PATH}"));
    }
    if let Some(rest) = base_url.strip_prefix("https://") {
        return Ok(format!("wss://{rest}{WS_CHAT_PATH}"));
    }

    Err(ConfigError::InvalidBaseUrl(base_url.to_owned()))
}

fn parse_u64(var: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}

fn parse_nonzero(var: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match parse_u64(var, raw, default)? {
        0 => Err(ConfigError::InvalidValue { var, value: "0".to_owned() }),
        n => Ok(n),
    }
}

fn parse_bool(var: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(value) = raw else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { var, value }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
