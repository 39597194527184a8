//! Produce a display-safe copy of the config.

use serde_json::Value;

use crate::schema::AssistantConfig;

const SENSITIVE_KEYS: &[&str] = &["apiToken", "accessToken", "token", "password", "secret"];

/// Serialize the config with every credential-bearing field masked.
pub fn redact(config: &AssistantConfig) -> Value {
    let value = serde_json::to_value(config).unwrap_or(Value::Null);
    redact_value(&value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_value(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_sensitive_key(key) && !s.is_empty() => {
            Value::String(mask(s))
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_value(v, k)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_value(v, key)).collect()),
        other => other.clone(),
    }
}

/// Keep a short prefix as a hint when the secret is long enough.
fn mask(secret: &str) -> String {
    if secret.chars().count() > 8 {
        format!("{}***", secret.chars().take(4).collect::<String>())
    } else {
        "***".to_string()
    }
}
