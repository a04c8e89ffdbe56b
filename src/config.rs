//! Configuration management for streamchat
//!
//! The chat component receives a fully resolved [`Config`] at construction
//! and never reads files or the environment itself. The terminal host builds
//! that value from a YAML file, environment variables and CLI flags, in that
//! order of increasing precedence.

use crate::error::{Result, StreamchatError};
use anyhow::Context;
use crate::theme::HexColor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Remote endpoint and request behavior
    #[serde(default)]
    pub endpoint: EndpointConfig,
    /// Header, greeting and pacing of the chat box
    #[serde(default)]
    pub widget: WidgetConfig,
    /// User-facing strings
    #[serde(default)]
    pub messages: MessagesConfig,
    /// Color tokens
    #[serde(default)]
    pub theme: ThemeConfig,
    /// Send throttling
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// URL receiving `POST {query, history}`
    #[serde(default = "default_endpoint_url")]
    pub url: String,

    /// Deadline for response headers, and idle limit between body chunks
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Treat invalid UTF-8 in the response as a failure instead of
    /// substituting U+FFFD
    #[serde(default)]
    pub strict_decoding: bool,
}

fn default_endpoint_url() -> String {
    "https://example.com/chat".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_endpoint_url(),
            timeout_ms: default_timeout_ms(),
            strict_decoding: false,
        }
    }
}

impl EndpointConfig {
    /// Timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Widget chrome and pacing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Name shown in the header and as the responder label
    #[serde(default = "default_merchant_name")]
    pub merchant_name: String,

    /// Optional logo reference, shown in the header when set
    #[serde(default)]
    pub merchant_logo: Option<String>,

    /// Show the "Online" indicator under the name
    #[serde(default = "default_show_online_status")]
    pub show_online_status: bool,

    /// Pause before the thinking placeholder appears and the request starts
    #[serde(default = "default_loading_delay_ms")]
    pub loading_delay_ms: u64,
}

fn default_merchant_name() -> String {
    "My Chatbot".to_string()
}

fn default_show_online_status() -> bool {
    true
}

fn default_loading_delay_ms() -> u64 {
    600
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            merchant_name: default_merchant_name(),
            merchant_logo: None,
            show_online_status: default_show_online_status(),
            loading_delay_ms: default_loading_delay_ms(),
        }
    }
}

impl WidgetConfig {
    /// Loading delay as a `Duration`
    pub fn loading_delay(&self) -> Duration {
        Duration::from_millis(self.loading_delay_ms)
    }
}

/// User-facing strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesConfig {
    /// Greeting rendered when the session starts (may contain `<br>`)
    #[serde(default = "default_initial_message")]
    pub initial: String,

    /// Placeholder text while waiting; empty shows a thinking indicator
    #[serde(default)]
    pub thinking: String,

    /// Fixed text replacing a failed response
    #[serde(default = "default_error_message")]
    pub error: String,

    /// Hint shown for the input line
    #[serde(default = "default_input_placeholder")]
    pub input_placeholder: String,

    /// Text shown when the rate limiter rejects a send
    #[serde(default = "default_rate_limit_error")]
    pub rate_limit_error: String,
}

fn default_initial_message() -> String {
    "Hi there 👋<br>How can I help you today?".to_string()
}

fn default_error_message() -> String {
    "Oops! Something went wrong. Please try again.".to_string()
}

fn default_input_placeholder() -> String {
    "Enter a message...".to_string()
}

fn default_rate_limit_error() -> String {
    "You've sent too many messages. Please wait a minute and try again.".to_string()
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            initial: default_initial_message(),
            thinking: String::new(),
            error: default_error_message(),
            input_placeholder: default_input_placeholder(),
            rate_limit_error: default_rate_limit_error(),
        }
    }
}

/// Color tokens, as CSS-style hex strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Header background
    #[serde(default = "default_primary_bg")]
    pub primary_bg: String,
    /// Header text
    #[serde(default = "default_primary_text")]
    pub primary_text: String,
    /// Chat box background
    #[serde(default = "default_chatbox_bg")]
    pub chatbox_bg: String,
    /// Incoming bubble background
    #[serde(default = "default_incoming_chat_bg")]
    pub incoming_chat_bg: String,
    /// Incoming bubble text
    #[serde(default = "default_incoming_chat_text")]
    pub incoming_chat_text: String,
    /// Error bubble background
    #[serde(default = "default_error_chat_bg")]
    pub error_chat_bg: String,
    /// Error bubble text
    #[serde(default = "default_error_chat_text")]
    pub error_chat_text: String,
}

fn default_primary_bg() -> String {
    "#b31a69".to_string()
}

fn default_primary_text() -> String {
    "#fff".to_string()
}

fn default_chatbox_bg() -> String {
    "#ccc".to_string()
}

fn default_incoming_chat_bg() -> String {
    "#f2f2f2".to_string()
}

fn default_incoming_chat_text() -> String {
    "#000".to_string()
}

fn default_error_chat_bg() -> String {
    "#f8d7da".to_string()
}

fn default_error_chat_text() -> String {
    "#721c24".to_string()
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            primary_bg: default_primary_bg(),
            primary_text: default_primary_text(),
            chatbox_bg: default_chatbox_bg(),
            incoming_chat_bg: default_incoming_chat_bg(),
            incoming_chat_text: default_incoming_chat_text(),
            error_chat_bg: default_error_chat_bg(),
            error_chat_text: default_error_chat_text(),
        }
    }
}

impl ThemeConfig {
    /// Every token with its field name, for validation and display
    pub fn tokens(&self) -> [(&'static str, &str); 7] {
        [
            ("primary_bg", self.primary_bg.as_str()),
            ("primary_text", self.primary_text.as_str()),
            ("chatbox_bg", self.chatbox_bg.as_str()),
            ("incoming_chat_bg", self.incoming_chat_bg.as_str()),
            ("incoming_chat_text", self.incoming_chat_text.as_str()),
            ("error_chat_bg", self.error_chat_bg.as_str()),
            ("error_chat_text", self.error_chat_text.as_str()),
        ]
    }
}

/// Send throttling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Admitted sends per 60 second window
    #[serde(default = "default_max_messages_per_minute")]
    pub max_messages_per_minute: u32,
}

fn default_max_messages_per_minute() -> u32 {
    10
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_messages_per_minute: default_max_messages_per_minute(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used and a warning is
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)
                .with_context(|| format!("Failed to load config file {}", path))?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> std::result::Result<Self, StreamchatError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(url) = std::env::var("STREAMCHAT_ENDPOINT") {
            tracing::debug!(url = %url, "Env override: STREAMCHAT_ENDPOINT");
            self.endpoint.url = url;
        }

        if let Ok(timeout) = std::env::var("STREAMCHAT_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse() {
                self.endpoint.timeout_ms = value;
            } else {
                tracing::warn!("Invalid STREAMCHAT_TIMEOUT_MS: {}", timeout);
            }
        }

        if let Ok(delay) = std::env::var("STREAMCHAT_LOADING_DELAY_MS") {
            if let Ok(value) = delay.parse() {
                self.widget.loading_delay_ms = value;
            } else {
                tracing::warn!("Invalid STREAMCHAT_LOADING_DELAY_MS: {}", delay);
            }
        }

        if let Ok(limit) = std::env::var("STREAMCHAT_MAX_MESSAGES_PER_MINUTE") {
            if let Ok(value) = limit.parse() {
                self.rate_limit.max_messages_per_minute = value;
            } else {
                tracing::warn!("Invalid STREAMCHAT_MAX_MESSAGES_PER_MINUTE: {}", limit);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(url) = &cli.endpoint {
            tracing::debug!(url = %url, "CLI override: --endpoint");
            self.endpoint.url = url.clone();
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            tracing::debug!(timeout_ms, "CLI override: --timeout-ms");
            self.endpoint.timeout_ms = timeout_ms;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is not an http(s) URL, the timeout is
    /// zero, or a color token is not a hex color
    pub fn validate(&self) -> Result<()> {
        self.endpoint_url()?;

        if self.endpoint.timeout_ms == 0 {
            return Err(StreamchatError::Config(
                "endpoint.timeout_ms must be greater than 0".to_string(),
            )
            .into());
        }

        for (name, value) in self.theme.tokens() {
            if value.parse::<HexColor>().is_err() {
                return Err(StreamchatError::Config(format!(
                    "theme.{} must be a #rgb or #rrggbb color, got '{}'",
                    name, value
                ))
                .into());
            }
        }

        if self.rate_limit.max_messages_per_minute == 0 {
            tracing::warn!("rate_limit.max_messages_per_minute is 0; every message will be rejected");
        }

        Ok(())
    }

    /// Parsed endpoint URL
    ///
    /// # Errors
    ///
    /// Returns `StreamchatError::Config` if the URL does not parse or its
    /// scheme is not http or https
    pub fn endpoint_url(&self) -> Result<url::Url> {
        let url = url::Url::parse(&self.endpoint.url).map_err(|e| {
            StreamchatError::Config(format!("Invalid endpoint.url '{}': {}", self.endpoint.url, e))
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(StreamchatError::Config(format!(
                "endpoint.url must use http or https, got '{}'",
                other
            ))
            .into()),
        }
    }
}
