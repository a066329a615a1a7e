use std::collections::HashMap;

use axum::Json;
use axum::Router;
use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::json;

use super::*;
use crate::identity::UserId;

async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test backend");
    });
    format!("http://{addr}")
}

fn timeouts() -> HttpTimeouts {
    HttpTimeouts { request_secs: 5, connect_secs: 2 }
}

async fn history_handler(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> Response {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if auth != "Bearer tok-1" {
        return (StatusCode::UNAUTHORIZED, "bad token").into_response();
    }
    let a = params.get("userA").cloned().unwrap_or_default();
    let b = params.get("userB").cloned().unwrap_or_default();
    Json(json!([
        {"id": "m1", "sender": {"id": a}, "content": "hi", "sentAt": "t0"},
        {"id": "m2", "from": b, "content": "hello", "sentAt": "t1"},
        {"id": "m3"}
    ]))
    .into_response()
}

async fn conversations_handler(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let user = params.get("userId").cloned().unwrap_or_default();
    Json(json!([
        {"peerId": "p-1", "peer_name": format!("peer of {user}"), "last_message": "yo", "last_at": "t2"},
        {"peerId": "p-2"}
    ]))
}

#[tokio::test]
async fn history_sends_bearer_and_query_and_normalizes_items() {
    let app = Router::new().route(HISTORY_PATH, get(history_handler));
    let base = spawn_backend(app).await;
    let api = HttpChatApi::new(&base, Some("tok-1".into()), timeouts()).unwrap();

    let messages = api.history(&UserId::new("A"), &UserId::new("B")).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].from.as_str(), "A");
    assert_eq!(messages[1].from.as_str(), "B");
    assert!(messages.iter().all(|m| !m.pending));
}

#[tokio::test]
async fn history_without_token_surfaces_status_error() {
    let app = Router::new().route(HISTORY_PATH, get(history_handler));
    let base = spawn_backend(app).await;
    let api = HttpChatApi::new(&base, None, timeouts()).unwrap();

    let err = api.history(&UserId::new("A"), &UserId::new("B")).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 401, ref body } if body == "bad token"));
}

#[tokio::test]
async fn conversations_normalizes_field_aliases() {
    let app = Router::new().route(CONVERSATIONS_PATH, get(conversations_handler));
    let base = spawn_backend(app).await;
    let api = HttpChatApi::new(&format!("{base}/"), None, timeouts()).unwrap();

    let list = api.conversations(&UserId::new("u-7")).await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].peer_id.as_str(), "p-1");
    assert_eq!(list[0].peer_name, "peer of u-7");
    assert_eq!(list[0].last_message, "yo");
    assert_eq!(list[0].last_at, "t2");
    assert_eq!(list[1].peer_name, "p-2");
    assert_eq!(list[1].last_message, "");
}

#[tokio::test]
async fn unreachable_backend_is_http_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = HttpChatApi::new(&format!("http://{addr}"), None, timeouts()).unwrap();
    let err = api.conversations(&UserId::new("A")).await.unwrap_err();
    assert!(matches!(err, ApiError::Http(_)));
}

#[tokio::test]
async fn truncated_error_body_still_reports_status() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        assert!(stream.read(&mut request).await.unwrap() > 0);
        stream
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial")
            .await
            .unwrap();
        stream.shutdown().await.unwrap();
    });

    let api = HttpChatApi::new(&format!("http://{addr}"), None, timeouts()).unwrap();
    let err = api.conversations(&UserId::new("A")).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 500, ref body } if body.is_empty()));
}
