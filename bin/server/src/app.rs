//! HTTP surface.
//!
//! | Route | Method | Purpose |
//! |---|---|---|
//! | `/mcp` | POST | Tool protocol endpoint |
//! | `/webhook` | GET | WhatsApp subscription verification |
//! | `/webhook` | POST | WhatsApp notifications |
//! | `/health` | GET | Process and provider status |
//! | `/tools` | GET | Plain tool listing |
//! | `/stats` | GET | Store statistics |

use crate::error::AppError;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{Method, header},
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use parley_conversation::{StoreStats, UserContact};
use parley_core::UserId;
use parley_integration::{SubscriptionQuery, WebhookPayload};
use parley_protocol::{ToolDispatcher, ToolRequest, ToolResponse};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Name reported by the health endpoint.
pub const SERVICE_NAME: &str = "WhatsApp MCP Server";

/// Shared application state.
pub struct AppState {
    /// Tool dispatcher, which also owns the store.
    pub dispatcher: ToolDispatcher,
    /// Expected `hub.verify_token`.
    pub verify_token: Option<String>,
    /// Configured completion model, reported by `/health`.
    pub model: String,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(dispatcher: ToolDispatcher, verify_token: Option<String>, model: String) -> Self {
        Self {
            dispatcher,
            verify_token,
            model,
        }
    }
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/mcp", post(mcp))
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .route("/health", get(health))
        .route("/tools", get(tools))
        .route("/stats", get(stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Decodes one envelope and dispatches it.
///
/// Undecodable bodies never reach the dispatcher and get a plain 400.
async fn mcp(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ToolResponse>, AppError> {
    let request = ToolRequest::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, "Rejected malformed envelope");
        AppError::BadRequest(e.to_string())
    })?;
    Ok(Json(state.dispatcher.dispatch(request).await))
}

async fn verify_webhook(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SubscriptionQuery>,
) -> Result<String, AppError> {
    match query.verify(state.verify_token.as_deref()) {
        Some(challenge) => {
            tracing::info!("Webhook verified successfully");
            Ok(challenge.to_string())
        }
        None => {
            tracing::warn!("Webhook verification failed");
            Err(AppError::Forbidden)
        }
    }
}

/// Records each inbound sender as a user and logs the message.
///
/// Messages are not routed into the chat tool here.
async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<&'static str, AppError> {
    let payload: WebhookPayload = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, "Error decoding webhook");
        AppError::BadRequest("Bad Request".to_string())
    })?;

    let store = state.dispatcher.store();
    for inbound in payload.inbound_messages() {
        let Ok(user_id) = UserId::new(inbound.from.as_str()) else {
            tracing::warn!(message_id = %inbound.message_id, "Webhook message without sender");
            continue;
        };

        let mut contact = UserContact::new(user_id).with_phone_number(inbound.from.as_str());
        if let Some(name) = &inbound.contact_name {
            contact = contact.with_name(name.as_str());
        }
        if let Err(e) = store.upsert_user(contact).await {
            tracing::warn!(error = %e, from = %inbound.from, "Failed to record WhatsApp user");
        }

        tracing::info!(
            from = %inbound.from,
            name = inbound.contact_name.as_deref().unwrap_or_default(),
            message_id = %inbound.message_id,
            text = %inbound.text,
            "Received WhatsApp message"
        );
    }

    Ok("OK")
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let provider = if state.dispatcher.provider_configured() {
        "configured"
    } else {
        "not configured"
    };

    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "version": env!("CARGO_PKG_VERSION"),
        "completion_provider": provider,
        "model": state.model,
    }))
}

async fn tools(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "tools": state.dispatcher.tools() }))
}

async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StoreStats>, AppError> {
    state
        .dispatcher
        .store()
        .stats()
        .await
        .map(Json)
        .map_err(|e| AppError::Stats(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use chrono::DateTime;
    use parley_conversation::{
        ConversationStore, MemoryStore, Message, NewMessage, StoreError, User,
    };
    use tower::ServiceExt;

    fn state_with(store: Arc<dyn ConversationStore>, verify_token: Option<&str>) -> Arc<AppState> {
        Arc::new(AppState::new(
            ToolDispatcher::new(store),
            verify_token.map(str::to_string),
            "grok-beta".to_string(),
        ))
    }

    async fn send(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, Bytes) {
        let response = router(state).oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    fn post_request(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
            .expect("request")
    }

    #[tokio::test]
    async fn health_reports_provider_status() {
        let state = state_with(Arc::new(MemoryStore::new()), None);
        let (status, body) = send(state, get_request("/health")).await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], SERVICE_NAME);
        assert_eq!(json["completion_provider"], "not configured");
        assert_eq!(json["model"], "grok-beta");
        assert!(json["timestamp"].as_str().is_some());
    }

    #[tokio::test]
    async fn tools_lists_both_tools() {
        let state = state_with(Arc::new(MemoryStore::new()), None);
        let (status, body) = send(state, get_request("/tools")).await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["tools"][0]["name"], "chat");
        assert_eq!(json["tools"][1]["name"], "history");
        assert!(json["tools"][0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn mcp_rejects_malformed_bodies() {
        let state = state_with(Arc::new(MemoryStore::new()), None);

        let (status, body) = send(state.clone(), post_request("/mcp", "{oops")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(&body[..], b"Invalid JSON");

        let (status, body) = send(state, post_request("/mcp", r#"{"id":1}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(&body[..], b"Method required");
    }

    #[tokio::test]
    async fn mcp_only_accepts_post() {
        let state = state_with(Arc::new(MemoryStore::new()), None);
        let (status, _) = send(state, get_request("/mcp")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn mcp_unknown_method_is_200_with_error() {
        let state = state_with(Arc::new(MemoryStore::new()), None);
        let (status, body) = send(
            state,
            post_request("/mcp", r#"{"jsonrpc":"2.0","id":"x","method":"ping"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(
            json,
            json!({
                "jsonrpc": "2.0",
                "id": "x",
                "error": { "code": -32601, "message": "Method not found" }
            })
        );
    }

    #[tokio::test]
    async fn webhook_verification() {
        let state = state_with(Arc::new(MemoryStore::new()), Some("secret"));

        let (status, body) = send(
            state.clone(),
            get_request("/webhook?hub.mode=subscribe&hub.verify_token=secret&hub.challenge=1234"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"1234");

        let (status, _) = send(
            state,
            get_request("/webhook?hub.mode=subscribe&hub.verify_token=wrong&hub.challenge=1234"),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn webhook_records_sender() {
        let store = Arc::new(MemoryStore::new());
        let state = state_with(store.clone(), None);
        let payload = json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "contacts": [{ "profile": { "name": "Ada" }, "wa_id": "15550001" }],
                        "messages": [{
                            "from": "15550001",
                            "id": "wamid.1",
                            "type": "text",
                            "text": { "body": "hello" }
                        }]
                    }
                }]
            }]
        });

        let (status, body) = send(state, post_request("/webhook", payload.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"OK");

        let user = store
            .user(&UserId::new("15550001").expect("valid"))
            .await
            .expect("lookup")
            .expect("recorded");
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert_eq!(user.phone_number.as_deref(), Some("15550001"));
        // Not routed into chat.
        assert_eq!(store.stats().await.expect("stats").total_messages, 0);
    }

    #[tokio::test]
    async fn webhook_rejects_bad_json() {
        let state = state_with(Arc::new(MemoryStore::new()), None);
        let (status, _) = send(state, post_request("/webhook", "not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn stats_reports_counts() {
        let store = Arc::new(MemoryStore::new());
        store
            .append_message(
                NewMessage::user(UserId::new("u1").expect("valid"), "hi").expect("valid"),
            )
            .await
            .expect("append");
        let state = state_with(store, None);

        let (status, body) = send(state, get_request("/stats")).await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(
            json,
            json!({
                "total_messages": 1,
                "total_users": 0,
                "active_sessions": 0,
                "messages_today": 1
            })
        );
    }

    struct BrokenStore;

    fn broken() -> StoreError {
        StoreError::operation("query", "database is locked")
    }

    #[async_trait]
    impl ConversationStore for BrokenStore {
        async fn append_message(&self, _message: NewMessage) -> Result<Message, StoreError> {
            Err(broken())
        }
        async fn history(
            &self,
            _user_id: &UserId,
            _limit: i64,
        ) -> Result<Vec<Message>, StoreError> {
            Err(broken())
        }
        async fn upsert_user(&self, _contact: UserContact) -> Result<(), StoreError> {
            Err(broken())
        }
        async fn user(&self, _user_id: &UserId) -> Result<Option<User>, StoreError> {
            Err(broken())
        }
        async fn save_session(
            &self,
            _user_id: &UserId,
            _data: &str,
            _expires_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            Err(broken())
        }
        async fn active_session(&self, _user_id: &UserId) -> Result<Option<String>, StoreError> {
            Err(broken())
        }
        async fn purge_expired_sessions(&self) -> Result<u64, StoreError> {
            Err(broken())
        }
        async fn stats(&self) -> Result<StoreStats, StoreError> {
            Err(broken())
        }
    }

    #[tokio::test]
    async fn stats_failure_is_500() {
        let state = state_with(Arc::new(BrokenStore), None);
        let (status, body) = send(state, get_request("/stats")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(&body[..], b"Failed to get stats");
    }
}
