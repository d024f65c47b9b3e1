//! OpenAI-compatible chat-completion provider.
//!
//! Talks to any endpoint implementing `POST {base_url}/chat/completions`
//! (xAI Grok, OpenAI, local gateways) with bearer-token authentication.

use crate::backend::{ChatMessage, CompletionProvider, CompletionSettings, ConversationWindow};
use crate::error::LlmError;
use async_trait::async_trait;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Provider for OpenAI-compatible chat-completion APIs.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    settings: CompletionSettings,
}

impl OpenAiCompatibleProvider {
    /// Creates a provider for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot
    /// be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        settings: CompletionSettings,
    ) -> Result<Self, Report<LlmError>> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::InvalidConfig {
                reason: "API key must not be empty".to_string(),
            }
            .into());
        }

        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| LlmError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
            settings,
        })
    }

    /// Returns the settings applied to every request.
    #[must_use]
    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    #[instrument(
        skip(self, window),
        fields(model = %self.settings.model, window_len = window.len())
    )]
    async fn complete(&self, window: &ConversationWindow) -> Result<String, Report<LlmError>> {
        let url = self.completions_url();
        let body = ChatCompletionRequest {
            model: &self.settings.model,
            messages: window.messages(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            stream: false,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, endpoint = %url, "Failed to reach completion endpoint");
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::RequestFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseParseFailed {
                reason: e.to_string(),
            })?;

        if status != reqwest::StatusCode::OK {
            let message = match serde_json::from_str::<ErrorEnvelope>(&text) {
                Ok(envelope) => envelope.error.message,
                Err(_) => text,
            };
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::ResponseParseFailed {
                reason: e.to_string(),
            })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;

        debug!("completion received");
        Ok(choice.message.content.unwrap_or_default())
    }

    fn model(&self) -> &str {
        &self.settings.model
    }
}
