//! Environment overrides for config values.
//!
//! `SOLAROPS_*` variables win over the file. Empty values are ignored.

use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::schema::{AssistantConfig, LoggingConfig};

pub const ENV_API_BASE_URL: &str = "SOLAROPS_API_BASE_URL";
pub const ENV_CHAT_ENDPOINT: &str = "SOLAROPS_CHAT_ENDPOINT";
pub const ENV_API_TOKEN: &str = "SOLAROPS_API_TOKEN";
pub const ENV_RESPONSE_BLOCK_DELAY_MS: &str = "SOLAROPS_RESPONSE_BLOCK_DELAY_MS";
pub const ENV_LOG_LEVEL: &str = "SOLAROPS_LOG_LEVEL";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: AssistantConfig) -> Result<AssistantConfig> {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from a provided map (useful for testing).
pub fn apply_env_overrides_with(
    mut config: AssistantConfig,
    env: &HashMap<String, String>,
) -> Result<AssistantConfig> {
    let get = |key: &str| env.get(key).filter(|v| !v.trim().is_empty()).cloned();

    if let Some(url) = get(ENV_API_BASE_URL) {
        config.api_base_url = Some(url);
    }
    if let Some(endpoint) = get(ENV_CHAT_ENDPOINT) {
        config.chat_endpoint = Some(endpoint);
    }
    if let Some(token) = get(ENV_API_TOKEN) {
        config.api_token = Some(token);
    }
    if let Some(raw) = get(ENV_RESPONSE_BLOCK_DELAY_MS) {
        let ms = raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{ENV_RESPONSE_BLOCK_DELAY_MS} must be an integer, got {raw:?}"))?;
        config.response_block_delay_ms = Some(ms);
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config
            .logging
            .get_or_insert_with(LoggingConfig::default)
            .level = Some(level);
    }

    Ok(config)
}
