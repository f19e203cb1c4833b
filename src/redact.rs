//! Credential redaction for inbound webhook payloads before they hit the logs.

use serde_json::Value;

/// Replacement written over credential-shaped values.
const MASK: &str = "***";

/// Key fragments that mark a value as credential-shaped. Matching is
/// case-insensitive and ignores `-`/`_` so header-style and snake_case
/// variants are caught by the same list.
const SENSITIVE_KEYS: &[&str] = &["token", "authorization", "apikey", "password", "secret"];

/// Return a copy of `payload` with every credential-shaped value replaced by
/// `***`, recursing through nested objects and arrays.
pub fn redact_payload(payload: &Value) -> Value {
    match payload {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String(MASK.into()))
                    } else {
                        (key.clone(), redact_payload(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_payload).collect()),
        other => other.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let canonical: String = key
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();

    SENSITIVE_KEYS
        .iter()
        .any(|fragment| canonical.contains(fragment))
}
