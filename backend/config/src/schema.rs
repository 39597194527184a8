//! Assistant configuration schema, deserialized from camelCase YAML.
//!
//! Every field is optional on disk; [`crate::defaults::apply_all_defaults`]
//! fills the gaps and the accessors below fall back to the same constants.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::defaults::{
    DEFAULT_API_BASE_URL, DEFAULT_BACKOFF_FACTOR, DEFAULT_CHAT_ENDPOINT, DEFAULT_LOG_DIR,
    DEFAULT_LOG_LEVEL, DEFAULT_RECONNECT_BASE_DELAY_MS, DEFAULT_RECONNECT_MAX_DELAY_MS,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_RESPONSE_BLOCK_DELAY_MS,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    /// Base URL of the REST API that issues chat sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,

    /// Base URL of the assistant socket (ws:// or wss://)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_endpoint: Option<String>,

    /// Bearer token presented to the REST API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Delay before an empty response block is shown for a pending question
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_block_delay_ms: Option<u64>,

    /// Timeout for the session issuance request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reconnect: Option<ReconnectConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Backoff between transport reconnect attempts. Attempts are unbounded while
/// the session is active.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconnectConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jitter: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Level filter when `RUST_LOG` is unset ("info", "debug", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rolling NDJSON log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Emit JSON on the console as well
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

impl AssistantConfig {
    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn chat_endpoint(&self) -> &str {
        self.chat_endpoint.as_deref().unwrap_or(DEFAULT_CHAT_ENDPOINT)
    }

    pub fn response_block_delay(&self) -> Duration {
        Duration::from_millis(
            self.response_block_delay_ms
                .unwrap_or(DEFAULT_RESPONSE_BLOCK_DELAY_MS),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS))
    }

    pub fn reconnect(&self) -> ReconnectConfig {
        self.reconnect.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

impl ReconnectConfig {
    pub fn base_delay_ms(&self) -> u64 {
        self.base_delay_ms.unwrap_or(DEFAULT_RECONNECT_BASE_DELAY_MS)
    }

    pub fn backoff_factor(&self) -> f64 {
        self.backoff_factor.unwrap_or(DEFAULT_BACKOFF_FACTOR)
    }

    pub fn max_delay_ms(&self) -> u64 {
        self.max_delay_ms.unwrap_or(DEFAULT_RECONNECT_MAX_DELAY_MS)
    }

    pub fn jitter(&self) -> bool {
        self.jitter.unwrap_or(true)
    }
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn dir(&self) -> &str {
        self.dir.as_deref().unwrap_or(DEFAULT_LOG_DIR)
    }

    pub fn json(&self) -> bool {
        self.json.unwrap_or(false)
    }
}
