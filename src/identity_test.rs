use super::*;

#[test]
fn user_id_trims_surrounding_whitespace() {
    assert_eq!(UserId::new("  u-1\n"), UserId::new("u-1"));
    assert_eq!(UserId::new(" u-1 ").as_str(), "u-1");
}

#[test]
fn user_id_equality_is_not_numeric() {
    assert_ne!(UserId::new("007"), UserId::new("7"));
}

#[test]
fn user_id_deserializes_trimmed() {
    let id: UserId = serde_json::from_str("\" ADMIN \"").unwrap();
    assert_eq!(id.as_str(), "ADMIN");
}

#[test]
fn resolve_rejects_missing_or_blank_user() {
    assert!(Identity::resolve(None, Some("tok".into())).is_none());
    assert!(Identity::resolve(Some("   "), Some("tok".into())).is_none());
}

#[test]
fn resolve_drops_blank_token() {
    let identity = Identity::resolve(Some("u-1"), Some("  ".into())).unwrap();
    assert_eq!(identity.user_id.as_str(), "u-1");
    assert!(identity.token.is_none());
}

#[test]
fn debug_redacts_token() {
    let identity = Identity::resolve(Some("u-1"), Some("secret-token".into())).unwrap();
    let rendered = format!("{identity:?}");
    assert!(!rendered.contains("secret-token"));
    assert!(rendered.contains("<redacted>"));
}
