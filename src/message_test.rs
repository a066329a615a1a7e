use serde_json::json;

use super::*;

#[test]
fn pending_message_has_local_key_and_timestamp() {
    let msg = Message::pending(UserId::new("A"), "yo");
    assert!(msg.pending);
    assert!(msg.id.is_none());
    assert!(msg.local_key.as_deref().is_some_and(|k| k.starts_with("temp-")));
    assert!(msg.sent_at.is_some());
    assert_eq!(msg.key(), msg.local_key.as_deref());
}

#[test]
fn pending_messages_get_distinct_keys() {
    let a = Message::pending(UserId::new("A"), "same");
    let b = Message::pending(UserId::new("A"), "same");
    assert_ne!(a.local_key, b.local_key);
}

#[test]
fn history_item_prefers_sender_id() {
    let msg = Message::from_history_value(&json!({
        "id": "m1",
        "sender": {"id": "A", "name": "Alice"},
        "from": "ignored",
        "content": "hi",
        "sentAt": "2024-05-01T10:00:00"
    }))
    .unwrap();
    assert_eq!(msg.id.as_deref(), Some("m1"));
    assert_eq!(msg.from.as_str(), "A");
    assert_eq!(msg.content, "hi");
    assert!(!msg.pending);
}

#[test]
fn history_item_falls_back_to_from_then_empty() {
    let msg = Message::from_history_value(&json!({"id": "m1", "from": "B", "content": "x"})).unwrap();
    assert_eq!(msg.from.as_str(), "B");

    let msg = Message::from_history_value(&json!({"id": "m2", "content": "x"})).unwrap();
    assert!(msg.from.is_empty());
}

#[test]
fn history_item_without_content_is_rejected() {
    assert!(Message::from_history_value(&json!({"id": "m1", "from": "A"})).is_none());
    assert!(Message::from_history_value(&json!("nope")).is_none());
}

#[test]
fn parse_history_drops_malformed_items_and_keeps_order() {
    let body = json!([
        {"id": "m1", "from": "A", "content": "one"},
        {"id": "bad"},
        {"id": "m3", "from": "B", "content": "three"}
    ]);
    let messages = parse_history(&body);
    let ids: Vec<_> = messages.iter().filter_map(|m| m.id.as_deref()).collect();
    assert_eq!(ids, vec!["m1", "m3"]);
}

#[test]
fn parse_history_non_array_is_empty() {
    assert!(parse_history(&json!({"error": "x"})).is_empty());
    assert!(parse_history(&Value::Null).is_empty());
}

#[test]
fn from_frame_is_confirmed() {
    let frame = ChatFrame {
        id: Some("m9".into()),
        from: UserId::new("B"),
        to: Some(UserId::new("A")),
        content: "hey".into(),
        sent_at: Some("t1".into()),
        client_id: None,
    };
    let msg = Message::from_frame(&frame);
    assert_eq!(msg.key(), Some("m9"));
    assert!(!msg.pending);
    assert_eq!(msg.sent_at.as_deref(), Some("t1"));
}
