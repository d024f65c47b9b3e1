//! End-to-end tests of the `/mcp` endpoint over a real SQLite store.

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use parley_conversation::{ConversationStore, DEFAULT_FALLBACK_RESPONSES, MessageRole};
use parley_core::UserId;
use parley_protocol::ToolDispatcher;
use parley_server::app::{AppState, router};
use parley_server::db::SqliteStore;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct Harness {
    state: Arc<AppState>,
    store: Arc<SqliteStore>,
    _dir: TempDir,
}

async fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(
        SqliteStore::connect(dir.path().join("e2e.db"))
            .await
            .expect("connect"),
    );
    let state = Arc::new(AppState::new(
        ToolDispatcher::new(store.clone()),
        None,
        "grok-beta".to_string(),
    ));
    Harness {
        state,
        store,
        _dir: dir,
    }
}

async fn post_mcp(state: &Arc<AppState>, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    let response = router(state.clone())
        .oneshot(request)
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

fn tool_payload(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"]
        .as_str()
        .expect("text content");
    serde_json::from_str(text).expect("json payload")
}

#[tokio::test]
async fn initialize_and_list() {
    let h = harness().await;

    let (status, response) = post_mcp(
        &h.state,
        json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert!(response.get("error").is_none());

    let (_, response) = post_mcp(
        &h.state,
        json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
    )
    .await;
    assert_eq!(response["result"]["tools"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn chat_then_history_round_trip() {
    let h = harness().await;

    let (status, response) = post_mcp(
        &h.state,
        json!({
            "jsonrpc": "2.0",
            "id": "c1",
            "method": "tools/call",
            "params": { "name": "chat", "arguments": { "user_id": "u1", "message": "hi" } }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["id"], "c1");
    assert_eq!(
        tool_payload(&response),
        json!({ "response": DEFAULT_FALLBACK_RESPONSES[4], "user_id": "u1" })
    );

    let (_, response) = post_mcp(
        &h.state,
        json!({
            "jsonrpc": "2.0",
            "id": "h1",
            "method": "tools/call",
            "params": { "name": "history", "arguments": { "user_id": "u1" } }
        }),
    )
    .await;
    let payload = tool_payload(&response);
    let messages = payload["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "hi");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], DEFAULT_FALLBACK_RESPONSES[4]);
    assert!(
        messages[0]["created_at"]
            .as_str()
            .is_some_and(|s| s.ends_with('Z'))
    );

    let stored = h
        .store
        .history(&UserId::new("u1").expect("valid"), 20)
        .await
        .expect("history");
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn tool_errors_are_protocol_errors() {
    let h = harness().await;

    let (status, response) = post_mcp(
        &h.state,
        json!({
            "jsonrpc": "2.0",
            "id": 5,
            "method": "tools/call",
            "params": { "name": "chat", "arguments": { "message": "hi" } }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        response,
        json!({
            "jsonrpc": "2.0",
            "id": 5,
            "error": { "code": -32603, "message": "user_id is required and must be a string" }
        })
    );

    let (_, response) = post_mcp(
        &h.state,
        json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "tools/call",
            "params": { "name": "translate", "arguments": {} }
        }),
    )
    .await;
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Tool not found");

    assert_eq!(h.store.stats().await.expect("stats").total_messages, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_chats_keep_each_conversation_intact() {
    let h = harness().await;

    let handles: Vec<_> = (0..24)
        .map(|i| {
            let state = h.state.clone();
            let arguments = json!({
                "user_id": format!("user-{i}"),
                "message": format!("hello {i}"),
            });
            tokio::spawn(async move {
                post_mcp(
                    &state,
                    json!({
                        "jsonrpc": "2.0",
                        "id": i,
                        "method": "tools/call",
                        "params": { "name": "chat", "arguments": arguments }
                    }),
                )
                .await
            })
        })
        .collect();

    for handle in handles {
        let (status, response) = handle.await.expect("task joined");
        assert_eq!(status, StatusCode::OK);
        assert!(response.get("error").is_none(), "chat failed: {response}");
    }

    for i in 0..24 {
        let user = UserId::new(format!("user-{i}")).expect("valid");
        let messages = h.store.history(&user, 20).await.expect("history");
        let roles: Vec<_> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, [MessageRole::User, MessageRole::Assistant]);
        assert_eq!(messages[0].content, format!("hello {i}"));
        assert!(messages.iter().all(|m| m.user_id == user));
    }
    assert_eq!(h.store.stats().await.expect("stats").total_messages, 48);
}
