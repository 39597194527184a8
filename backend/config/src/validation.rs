//! Config validation with field paths in every message.

use crate::schema::AssistantConfig;
use thiserror::Error;
use url::Url;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &AssistantConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_endpoints(config, &mut report);
    validate_timing(config, &mut report);
    validate_reconnect(config, &mut report);
    report
}

fn validate_endpoints(config: &AssistantConfig, report: &mut ValidationReport) {
    match Url::parse(config.api_base_url()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            if url.scheme() == "http" && config.api_token.is_some() {
                report.warn("apiBaseUrl", "API token will be sent over plain http");
            }
        }
        Ok(url) => report.error(
            "apiBaseUrl",
            format!("Unsupported scheme '{}'. Use http or https", url.scheme()),
        ),
        Err(e) => report.error("apiBaseUrl", format!("Invalid URL: {e}")),
    }

    match Url::parse(config.chat_endpoint()) {
        Ok(url) if matches!(url.scheme(), "ws" | "wss") => {
            if url.query().is_some() {
                report.warn("chatEndpoint", "Query string is replaced by the session token");
            }
        }
        Ok(url) => report.error(
            "chatEndpoint",
            format!("Unsupported scheme '{}'. Use ws or wss", url.scheme()),
        ),
        Err(e) => report.error("chatEndpoint", format!("Invalid URL: {e}")),
    }
}

fn validate_timing(config: &AssistantConfig, report: &mut ValidationReport) {
    if config.request_timeout_ms == Some(0) {
        report.error("requestTimeoutMs", "requestTimeoutMs must be >= 1");
    }
    if let Some(delay) = config.response_block_delay_ms {
        if delay > 5_000 {
            report.warn(
                "responseBlockDelayMs",
                "Pending answers will look stalled for more than 5 seconds",
            );
        }
    }
}

fn validate_reconnect(config: &AssistantConfig, report: &mut ValidationReport) {
    let Some(reconnect) = &config.reconnect else { return };
    if reconnect.base_delay_ms == Some(0) {
        report.warn("reconnect.baseDelayMs", "Zero delay reconnects in a tight loop");
    }
    if reconnect.backoff_factor() < 1.0 {
        report.error("reconnect.backoffFactor", "backoffFactor must be >= 1.0");
    }
    if reconnect.max_delay_ms() < reconnect.base_delay_ms() {
        report.error("reconnect.maxDelayMs", "maxDelayMs must be >= baseDelayMs");
    }
}
