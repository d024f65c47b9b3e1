//! Messaging channel integration for the parley relay.
//!
//! This crate provides:
//!
//! - **Webhook payloads**: WhatsApp Business notification types and inbound message extraction
//! - **Verification**: the `hub.*` subscription challenge check
//! - **Send client**: outbound text messages through the Graph API

pub mod error;
pub mod whatsapp;

pub use error::IntegrationError;
pub use whatsapp::{
    Contact, ContactProfile, DEFAULT_API_BASE_URL, InboundMessage, InboundText, MessageText,
    SubscriptionQuery, WebhookChange, WebhookEntry, WebhookPayload, WebhookValue, WhatsAppClient,
    WhatsAppSettings,
};
