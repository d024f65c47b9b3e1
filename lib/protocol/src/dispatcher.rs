//! Request dispatch.
//!
//! `ToolDispatcher` turns one decoded request into one response. It holds no
//! per-request state; everything a call needs is re-read from the store.

use crate::envelope::{
    INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, PROTOCOL_VERSION, ProtocolError,
    ToolRequest, ToolResponse,
};
use crate::error::ToolCallError;
use crate::tools::{
    CHAT_TOOL, ChatArgs, ChatResult, HISTORY_TOOL, HistoryArgs, HistoryEntry, HistoryResult,
    ToolCallOutput, ToolDefinition, definitions,
};
use parley_ai::CompletionProvider;
use parley_conversation::{
    CONTEXT_WINDOW_LIMIT, ContextBuilder, ConversationStore, DEFAULT_HISTORY_LIMIT,
    FallbackResponder, Message, NewMessage,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Identity reported by `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "whatsapp-mcp-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Routes `initialize`, `tools/list` and `tools/call` requests.
#[derive(Clone)]
pub struct ToolDispatcher {
    store: Arc<dyn ConversationStore>,
    provider: Option<Arc<dyn CompletionProvider>>,
    context: ContextBuilder,
    fallback: FallbackResponder,
    server_info: ServerInfo,
}

impl ToolDispatcher {
    /// Creates a dispatcher with no completion provider.
    ///
    /// Without a provider every chat reply comes from the fallback responder.
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            store,
            provider: None,
            context: ContextBuilder::default(),
            fallback: FallbackResponder::default(),
            server_info: ServerInfo::default(),
        }
    }

    /// Sets the completion provider.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Replaces the context builder.
    #[must_use]
    pub fn with_context_builder(mut self, context: ContextBuilder) -> Self {
        self.context = context;
        self
    }

    /// Replaces the fallback responder.
    #[must_use]
    pub fn with_fallback(mut self, fallback: FallbackResponder) -> Self {
        self.fallback = fallback;
        self
    }

    /// Replaces the reported server identity.
    #[must_use]
    pub fn with_server_info(mut self, server_info: ServerInfo) -> Self {
        self.server_info = server_info;
        self
    }

    /// Whether a completion provider is set.
    #[must_use]
    pub fn provider_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// The store backing this dispatcher.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// The advertised tools.
    #[must_use]
    pub fn tools(&self) -> Vec<ToolDefinition> {
        definitions()
    }

    /// Handles one request. Always produces a response echoing its id.
    #[instrument(skip(self, request), fields(method = %request.method))]
    pub async fn dispatch(&self, request: ToolRequest) -> ToolResponse {
        let ToolRequest { id, method, params } = request;
        match method.as_str() {
            "initialize" => ToolResponse::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": self.server_info,
                }),
            ),
            "tools/list" => ToolResponse::success(id, json!({ "tools": self.tools() })),
            "tools/call" => match self.call_tool(params).await {
                Ok(result) => ToolResponse::success(id, result),
                Err(error) => ToolResponse::failure(id, error),
            },
            other => {
                debug!(method = other, "unknown method");
                ToolResponse::failure(id, ProtocolError::new(METHOD_NOT_FOUND, "Method not found"))
            }
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, ProtocolError> {
        let Some(Value::Object(params)) = params else {
            return Err(ProtocolError::new(INVALID_PARAMS, "Invalid params"));
        };
        let Some(Value::String(name)) = params.get("name") else {
            return Err(ProtocolError::new(INVALID_PARAMS, "Tool name required"));
        };
        let arguments = match params.get("arguments") {
            Some(Value::Object(arguments)) => arguments.clone(),
            _ => Map::new(),
        };

        let outcome = match name.as_str() {
            CHAT_TOOL => self.call_chat(&arguments).await,
            HISTORY_TOOL => self.call_history(&arguments).await,
            other => {
                debug!(tool = other, "unknown tool");
                return Err(ProtocolError::new(METHOD_NOT_FOUND, "Tool not found"));
            }
        };

        outcome.map_err(|e| {
            warn!(tool = %name, error = %e, "tool call failed");
            ProtocolError::new(INTERNAL_ERROR, e.to_string())
        })
    }

    async fn call_chat(&self, arguments: &Map<String, Value>) -> Result<Value, ToolCallError> {
        let args = ChatArgs::from_arguments(arguments)?;
        let result = self.chat(args).await?;
        encode(&result)
    }

    async fn call_history(&self, arguments: &Map<String, Value>) -> Result<Value, ToolCallError> {
        let args = HistoryArgs::from_arguments(arguments)?;
        let result = self.history(args).await?;
        encode(&result)
    }

    /// Runs the `chat` tool.
    ///
    /// Only the initial save of the user's message is fatal. A failed
    /// context fetch proceeds with no history, a failed provider call falls
    /// back to a canned reply, and a failed assistant save is logged while
    /// the reply is still returned.
    ///
    /// # Errors
    ///
    /// Returns `ToolCallError::Storage` if the user's message cannot be saved.
    #[instrument(skip(self, args), fields(user_id = %args.user_id))]
    pub async fn chat(&self, args: ChatArgs) -> Result<ChatResult, ToolCallError> {
        let ChatArgs { user_id, message } = args;

        let inbound = NewMessage::user(user_id.clone(), message.as_str())
            .map_err(|source| ToolCallError::Storage {
                operation: "save message",
                source,
            })?;
        let saved = self
            .store
            .append_message(inbound)
            .await
            .map_err(|source| ToolCallError::Storage {
                operation: "save message",
                source,
            })?;

        // Reads 11 rows, not 10: the just-saved message is among them and is
        // dropped here, leaving the 10 prior messages. The builder appends
        // the new message, so it reaches the provider exactly once.
        let history = match self
            .store
            .history(&user_id, CONTEXT_WINDOW_LIMIT as i64 + 1)
            .await
        {
            Ok(rows) => rows.into_iter().filter(|m| m.id != saved.id).collect(),
            Err(e) => {
                warn!(error = %e, "failed to load context, continuing without history");
                Vec::new()
            }
        };

        let response = self.generate_reply(&history, &message).await;

        match NewMessage::assistant(user_id.clone(), response.as_str()) {
            Ok(outbound) => {
                if let Err(e) = self.store.append_message(outbound).await {
                    warn!(error = %e, "failed to save assistant message");
                }
            }
            Err(e) => warn!(error = %e, "failed to save assistant message"),
        }

        Ok(ChatResult { response, user_id })
    }

    /// Runs the `history` tool.
    ///
    /// # Errors
    ///
    /// Returns `ToolCallError::Storage` if the store read fails.
    #[instrument(skip(self, args), fields(user_id = %args.user_id))]
    pub async fn history(&self, args: HistoryArgs) -> Result<HistoryResult, ToolCallError> {
        let limit = args.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        let messages = self
            .store
            .history(&args.user_id, limit)
            .await
            .map_err(|source| ToolCallError::Storage {
                operation: "get chat history",
                source,
            })?;

        Ok(HistoryResult {
            messages: messages.iter().map(HistoryEntry::from).collect(),
            user_id: args.user_id,
        })
    }

    async fn generate_reply(&self, history: &[Message], message: &str) -> String {
        if let Some(provider) = &self.provider {
            let window = self.context.build(history, message);
            match provider.complete(&window).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(model = provider.model(), "completion provider replied");
                    return text;
                }
                Ok(_) => warn!(
                    model = provider.model(),
                    "completion provider returned an empty reply, using fallback"
                ),
                Err(report) => warn!(
                    model = provider.model(),
                    error = %report,
                    "completion provider failed, using fallback"
                ),
            }
        }
        self.fallback.respond(message).to_string()
    }
}

fn encode<T: Serialize>(result: &T) -> Result<Value, ToolCallError> {
    let output = ToolCallOutput::text(result)?;
    serde_json::to_value(output).map_err(|e| ToolCallError::Encoding {
        reason: e.to_string(),
    })
}
