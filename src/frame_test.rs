use super::*;

// =============================================================================
// parse_inbound
// =============================================================================

#[test]
fn parses_system_frame() {
    let inbound = parse_inbound(r#"{"system":true,"message":"connected","userId":"u-1"}"#).unwrap();
    assert_eq!(inbound, Inbound::System { message: "connected".into() });
}

#[test]
fn system_frame_without_message_is_empty_notice() {
    let inbound = parse_inbound(r#"{"system":true}"#).unwrap();
    assert_eq!(inbound, Inbound::System { message: String::new() });
}

#[test]
fn parses_full_chat_frame() {
    let inbound =
        parse_inbound(r#"{"id":"m2","from":" A ","to":"B","content":"yo","sentAt":"2024-05-01T10:00:00"}"#)
            .unwrap();
    let Inbound::Chat(frame) = inbound else {
        panic!("expected chat frame");
    };
    assert_eq!(frame.id.as_deref(), Some("m2"));
    assert_eq!(frame.from, UserId::new("A"));
    assert_eq!(frame.to, Some(UserId::new("B")));
    assert_eq!(frame.content, "yo");
    assert_eq!(frame.sent_at.as_deref(), Some("2024-05-01T10:00:00"));
    assert!(frame.client_id.is_none());
}

#[test]
fn chat_frame_accepts_numeric_ids_and_null_timestamp() {
    let inbound = parse_inbound(r#"{"id":17,"from":42,"content":"hi","sentAt":null}"#).unwrap();
    let Inbound::Chat(frame) = inbound else {
        panic!("expected chat frame");
    };
    assert_eq!(frame.id.as_deref(), Some("17"));
    assert_eq!(frame.from.as_str(), "42");
    assert!(frame.sent_at.is_none());
    assert!(frame.to.is_none());
}

#[test]
fn chat_frame_reads_client_id_echo() {
    let inbound = parse_inbound(r#"{"from":"A","content":"x","clientId":"temp-1"}"#).unwrap();
    let Inbound::Chat(frame) = inbound else {
        panic!("expected chat frame");
    };
    assert_eq!(frame.client_id.as_deref(), Some("temp-1"));
}

#[test]
fn error_frame_becomes_server_error() {
    let inbound = parse_inbound(r#"{"error":"missing 'to' or 'from' or 'content' field"}"#).unwrap();
    assert!(matches!(inbound, Inbound::ServerError { ref message } if message.starts_with("missing")));
}

#[test]
fn rejects_invalid_json() {
    assert!(matches!(parse_inbound("{not json"), Err(FrameError::InvalidJson(_))));
}

#[test]
fn rejects_non_object() {
    assert!(matches!(parse_inbound("[1,2]"), Err(FrameError::NotAnObject)));
}

#[test]
fn rejects_chat_without_from() {
    assert!(matches!(parse_inbound(r#"{"content":"hi"}"#), Err(FrameError::MissingField("from"))));
}

#[test]
fn rejects_chat_without_content() {
    assert!(matches!(parse_inbound(r#"{"from":"A"}"#), Err(FrameError::MissingField("content"))));
}

// =============================================================================
// OutboundFrame
// =============================================================================

#[test]
fn outbound_frame_serializes_wire_shape() {
    let frame = OutboundFrame {
        to: UserId::new("B"),
        content: "hello".into(),
        from: UserId::new("A"),
        client_id: None,
    };
    let value: Value = serde_json::from_str(&frame.to_text().unwrap()).unwrap();
    assert_eq!(value, serde_json::json!({"to":"B","content":"hello","from":"A"}));
}

#[test]
fn outbound_frame_includes_client_id_when_set() {
    let frame = OutboundFrame {
        to: UserId::new("B"),
        content: "hello".into(),
        from: UserId::new("A"),
        client_id: Some("temp-9".into()),
    };
    let value: Value = serde_json::from_str(&frame.to_text().unwrap()).unwrap();
    assert_eq!(value["clientId"], "temp-9");
}
