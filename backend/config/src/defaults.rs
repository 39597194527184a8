//! Config defaults: applies default values to a parsed config.

use crate::schema::{AssistantConfig, LoggingConfig, ReconnectConfig};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

pub const DEFAULT_CHAT_ENDPOINT: &str = "ws://localhost:8000";

/// Long enough to skip the empty block for near-instant replies.
pub const DEFAULT_RESPONSE_BLOCK_DELAY_MS: u64 = 300;

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

pub const DEFAULT_RECONNECT_BASE_DELAY_MS: u64 = 500;

pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;

pub const DEFAULT_RECONNECT_MAX_DELAY_MS: u64 = 10_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: AssistantConfig) -> AssistantConfig {
    let config = apply_endpoint_defaults(config);
    let config = apply_timing_defaults(config);
    let config = apply_reconnect_defaults(config);
    apply_logging_defaults(config)
}

fn apply_endpoint_defaults(mut config: AssistantConfig) -> AssistantConfig {
    if config.api_base_url.is_none() {
        config.api_base_url = Some(DEFAULT_API_BASE_URL.to_string());
    }
    if config.chat_endpoint.is_none() {
        config.chat_endpoint = Some(DEFAULT_CHAT_ENDPOINT.to_string());
    }
    config
}

fn apply_timing_defaults(mut config: AssistantConfig) -> AssistantConfig {
    config
        .response_block_delay_ms
        .get_or_insert(DEFAULT_RESPONSE_BLOCK_DELAY_MS);
    config.request_timeout_ms.get_or_insert(DEFAULT_REQUEST_TIMEOUT_MS);
    config
}

fn apply_reconnect_defaults(mut config: AssistantConfig) -> AssistantConfig {
    let reconnect = config.reconnect.get_or_insert_with(ReconnectConfig::default);
    reconnect.base_delay_ms.get_or_insert(DEFAULT_RECONNECT_BASE_DELAY_MS);
    reconnect.backoff_factor.get_or_insert(DEFAULT_BACKOFF_FACTOR);
    reconnect.max_delay_ms.get_or_insert(DEFAULT_RECONNECT_MAX_DELAY_MS);
    reconnect.jitter.get_or_insert(true);
    config
}

fn apply_logging_defaults(mut config: AssistantConfig) -> AssistantConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.dir.is_none() {
        logging.dir = Some(DEFAULT_LOG_DIR.to_string());
    }
    logging.json.get_or_insert(false);
    config
}
