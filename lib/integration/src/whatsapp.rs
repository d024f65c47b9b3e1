//! WhatsApp Business webhook and send client.
//!
//! Inbound notifications arrive as `object -> entry[] -> changes[] -> value`
//! trees. Only changes whose `field` is `messages` carry user messages; the
//! sender's display name lives in a sibling `contacts` list keyed by `wa_id`.

use crate::error::IntegrationError;
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Graph API base used when none is configured.
pub const DEFAULT_API_BASE_URL: &str = "https://graph.facebook.com/v18.0";

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// A webhook notification body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub value: WebhookValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

/// A message as delivered by the webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    /// Sender's WhatsApp id (their phone number).
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: Option<MessageText>,
    /// Unix seconds, as sent by the API.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Message text, either bare or wrapped in `{"body": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum MessageText {
    Plain(String),
    Body { body: String },
}

impl MessageText {
    /// The text content.
    #[must_use]
    pub fn body(&self) -> &str {
        match self {
            Self::Plain(body) | Self::Body { body } => body,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub profile: ContactProfile,
    #[serde(default)]
    pub wa_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactProfile {
    #[serde(default)]
    pub name: Option<String>,
}

/// An inbound message paired with its sender's contact details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundText {
    pub from: String,
    pub message_id: String,
    pub text: String,
    pub contact_name: Option<String>,
}

impl WebhookPayload {
    /// Extracts every message from `messages` changes, in delivery order.
    #[must_use]
    pub fn inbound_messages(&self) -> Vec<InboundText> {
        self.entry
            .iter()
            .flat_map(|entry| &entry.changes)
            .filter(|change| change.field == "messages")
            .flat_map(|change| {
                let contacts = &change.value.contacts;
                change.value.messages.iter().map(move |message| InboundText {
                    from: message.from.clone(),
                    message_id: message.id.clone(),
                    text: message
                        .text
                        .as_ref()
                        .map(|t| t.body().to_string())
                        .unwrap_or_default(),
                    contact_name: contacts
                        .iter()
                        .find(|c| c.wa_id == message.from)
                        .and_then(|c| c.profile.name.clone()),
                })
            })
            .collect()
    }
}

/// Query parameters of the subscription verification request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubscriptionQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

impl SubscriptionQuery {
    /// Returns the challenge to echo if this is a valid subscribe request
    /// for `expected_token`.
    ///
    /// An unset or empty expected token rejects every request.
    #[must_use]
    pub fn verify(&self, expected_token: Option<&str>) -> Option<&str> {
        let expected = expected_token.filter(|t| !t.is_empty())?;
        if self.mode.as_deref() == Some("subscribe")
            && self.verify_token.as_deref() == Some(expected)
        {
            Some(self.challenge.as_deref().unwrap_or_default())
        } else {
            None
        }
    }
}

/// Channel credentials and endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhatsAppSettings {
    pub api_base_url: String,
    pub phone_number_id: Option<String>,
    pub access_token: Option<String>,
}

impl Default for WhatsAppSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            phone_number_id: None,
            access_token: None,
        }
    }
}

#[derive(Serialize)]
struct SendTextRequest<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    text: SendTextBody<'a>,
}

#[derive(Serialize)]
struct SendTextBody<'a> {
    body: &'a str,
}

#[derive(Deserialize)]
struct SendTextResponse {
    #[serde(default)]
    messages: Vec<SentMessage>,
}

#[derive(Deserialize)]
struct SentMessage {
    id: String,
}

/// Sends outbound text messages.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    http: reqwest::Client,
    settings: WhatsAppSettings,
}

impl WhatsAppClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: WhatsAppSettings) -> Result<Self, Report<IntegrationError>> {
        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| IntegrationError::RequestFailed {
                reason: e.to_string(),
            })?;
        Ok(Self { http, settings })
    }

    /// Whether both the access token and phone number id are set.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.settings.access_token.as_deref().is_some_and(|t| !t.is_empty())
            && self
                .settings
                .phone_number_id
                .as_deref()
                .is_some_and(|p| !p.is_empty())
    }

    /// Sends `body` to `to` and returns the message id the API assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if credentials are missing, the request fails, or
    /// the API answers with anything but 200.
    #[instrument(skip(self, body), fields(to = %to))]
    pub async fn send_text(
        &self,
        to: &str,
        body: &str,
    ) -> Result<String, Report<IntegrationError>> {
        let token = self
            .settings
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(IntegrationError::NotConfigured {
                setting: "access token",
            })?;
        let phone_number_id = self
            .settings
            .phone_number_id
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(IntegrationError::NotConfigured {
                setting: "phone number id",
            })?;

        let url = format!(
            "{}/{phone_number_id}/messages",
            self.settings.api_base_url.trim_end_matches('/')
        );
        let request = SendTextRequest {
            messaging_product: "whatsapp",
            to,
            kind: "text",
            text: SendTextBody { body },
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to reach WhatsApp API");
                IntegrationError::RequestFailed {
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(IntegrationError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: SendTextResponse =
            response
                .json()
                .await
                .map_err(|e| IntegrationError::ResponseParseFailed {
                    reason: e.to_string(),
                })?;
        let id = parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or(IntegrationError::ResponseParseFailed {
                reason: "response contained no message id".to_string(),
            })?;

        info!(message_id = %id, "message sent");
        Ok(id)
    }
}
