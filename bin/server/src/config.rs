//! Centralized server configuration.
//!
//! Loaded once at startup via the `config` crate from environment
//! variables. Nested sections use `__` as the separator, so
//! `COMPLETION__API_KEY` sets `completion.api_key`.

use parley_ai::CompletionSettings;
use parley_integration::{DEFAULT_API_BASE_URL, WhatsAppSettings};
use serde::Deserialize;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database file. Created if missing.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Deployment environment label, reported in logs only.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Completion provider configuration.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// WhatsApp Business configuration.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Background cleanup configuration.
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

fn default_port() -> u16 {
    8080
}

fn default_database_path() -> String {
    "./mcp_server.db".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

/// Completion provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    /// Bearer token. Unset or empty leaves the provider unconfigured.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://api.x.ai/v1".to_string()
}

fn default_model() -> String {
    "grok-beta".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl CompletionConfig {
    /// The API key, if set and non-empty.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }

    /// Request settings for the provider client.
    #[must_use]
    pub fn settings(&self) -> CompletionSettings {
        CompletionSettings::new(self.model.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_timeout(Duration::from_secs(self.timeout_seconds))
    }
}

/// WhatsApp Business configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub access_token: Option<String>,

    /// Token expected in `hub.verify_token` during webhook verification.
    #[serde(default)]
    pub verify_token: Option<String>,

    #[serde(default)]
    pub phone_number_id: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            verify_token: None,
            phone_number_id: None,
            api_base_url: default_api_base_url(),
        }
    }
}

impl WhatsAppConfig {
    /// Settings for the outbound send client.
    #[must_use]
    pub fn settings(&self) -> WhatsAppSettings {
        WhatsAppSettings {
            api_base_url: self.api_base_url.clone(),
            phone_number_id: self.phone_number_id.clone(),
            access_token: self.access_token.clone(),
        }
    }
}

/// Background cleanup configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Interval between expired-session purges, in seconds.
    #[serde(default = "default_cleanup_interval_seconds")]
    pub interval_seconds: u64,
}

fn default_cleanup_interval_seconds() -> u64 {
    3600
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_cleanup_interval_seconds(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_environment(config::Environment::default())
    }

    /// Loads configuration from the given environment source.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but invalid.
    pub fn from_environment(
        environment: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        // Values stay strings; numeric fields are converted on deserialize.
        config::Config::builder()
            .add_source(environment.separator("__"))
            .build()?
            .try_deserialize()
    }

    /// The socket address to listen on.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}
