//! Log Redaction Layer
//!
//! Scrubs session tokens and bearer credentials from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").unwrap());
static TOKEN_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)((?:access_)?token=)[^&\s#]+").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = BEARER_RE.replace_all(input, "Bearer [REDACTED_TOKEN]");
    redact_url_token(&redacted)
}

/// Replace the value of any `token=` query parameter.
pub fn redact_url_token(url: &str) -> String {
    TOKEN_PARAM_RE
        .replace_all(url, "${1}[REDACTED_TOKEN]")
        .into_owned()
}
