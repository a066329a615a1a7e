use std::collections::HashMap;

use super::*;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn from_lookup_defaults() {
    let cfg = ChatConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    assert_eq!(cfg.ws_url, "ws://localhost:8087/ws/chat");
    assert_eq!(cfg.reconnect_delay, Duration::from_secs(5));
    assert_eq!(cfg.poll_interval, Duration::from_secs(3));
    assert_eq!(cfg.admin, AdminPeer { id: "ADMIN".into(), name: "Admin".into() });
    assert_eq!(
        cfg.timeouts,
        HttpTimeouts { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    );
    assert_eq!(cfg.event_capacity, DEFAULT_EVENT_CAPACITY);
    assert!(!cfg.correlation_ids);
    assert_eq!(cfg, ChatConfig::default());
}

#[test]
fn from_lookup_parses_overrides() {
    let cfg = ChatConfig::from_lookup(lookup(&[
        ("CHAT_BASE_URL", "https://chat.example.test/"),
        ("CHAT_RECONNECT_DELAY_MS", "250"),
        ("CHAT_POLL_INTERVAL_MS", "1000"),
        ("CHAT_ADMIN_PEER_ID", " root "),
        ("CHAT_ADMIN_PEER_NAME", "Support"),
        ("CHAT_REQUEST_TIMEOUT_SECS", "42"),
        ("CHAT_CONNECT_TIMEOUT_SECS", "7"),
        ("CHAT_EVENT_CAPACITY", "16"),
        ("CHAT_CORRELATION_IDS", "true"),
    ]))
    .unwrap();

    assert_eq!(cfg.base_url, "https://chat.example.test");
    assert_eq!(cfg.ws_url, "wss://chat.example.test/ws/chat");
    assert_eq!(cfg.reconnect_delay, Duration::from_millis(250));
    assert_eq!(cfg.poll_interval, Duration::from_secs(1));
    assert_eq!(cfg.admin.id, "root");
    assert_eq!(cfg.admin.name, "Support");
    assert_eq!(cfg.timeouts, HttpTimeouts { request_secs: 42, connect_secs: 7 });
    assert_eq!(cfg.event_capacity, 16);
    assert!(cfg.correlation_ids);
}

#[test]
fn explicit_ws_url_wins_over_derived() {
    let cfg = ChatConfig::from_lookup(lookup(&[
        ("CHAT_BASE_URL", "http://api.local:9000"),
        ("CHAT_WS_URL", "ws://push.local:9001/ws/chat/"),
    ]))
    .unwrap();
    assert_eq!(cfg.ws_url, "ws://push.local:9001/ws/chat");
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let cfg = ChatConfig::from_lookup(lookup(&[("CHAT_RECONNECT_DELAY_MS", "  ")])).unwrap();
    assert_eq!(cfg.reconnect_delay, Duration::from_secs(5));
}

#[test]
fn non_http_base_url_errors() {
    let err = ChatConfig::from_lookup(lookup(&[("CHAT_BASE_URL", "ftp://nope")]))
        .unwrap_err()
        .to_string();
    assert!(err.contains("invalid base URL"));
}

#[test]
fn non_ws_ws_url_errors() {
    let err = ChatConfig::from_lookup(lookup(&[("CHAT_WS_URL", "http://x/ws/chat")])).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { var: "CHAT_WS_URL", .. }));
}

#[test]
fn unparsable_number_errors() {
    let err = ChatConfig::from_lookup(lookup(&[("CHAT_RECONNECT_DELAY_MS", "soon")])).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { var: "CHAT_RECONNECT_DELAY_MS", .. }));
}

#[test]
fn zero_poll_interval_errors() {
    let err = ChatConfig::from_lookup(lookup(&[("CHAT_POLL_INTERVAL_MS", "0")])).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { var: "CHAT_POLL_INTERVAL_MS", .. }));
}

#[test]
fn zero_reconnect_delay_is_allowed() {
    let cfg = ChatConfig::from_lookup(lookup(&[("CHAT_RECONNECT_DELAY_MS", "0")])).unwrap();
    assert_eq!(cfg.reconnect_delay, Duration::ZERO);
}

#[test]
fn unknown_bool_errors() {
    let err = ChatConfig::from_lookup(lookup(&[("CHAT_CORRELATION_IDS", "maybe")])).unwrap_err();
    assert!(err.to_string().contains("CHAT_CORRELATION_IDS"));
}

#[test]
fn ws_url_maps_scheme() {
    assert_eq!(ws_url("http://h:1").unwrap(), "ws://h:1/ws/chat");
    assert_eq!(ws_url("https://h/").unwrap(), "wss://h/ws/chat");
    assert!(ws_url("h:1").is_err());
}
