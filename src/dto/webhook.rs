//! Webhook ingress payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Acknowledgement returned for every webhook delivery. Content problems are
/// reported here with HTTP 200 so the provider does not retry them.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookAck {
    /// Whether the payload was fully processed.
    pub success: bool,
    /// Human-readable outcome detail.
    pub message: String,
}

impl WebhookAck {
    /// Processed (or deliberately ignored) payload.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Payload that could not be acted on; still acknowledged with HTTP 200.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Liveness answer for `GET` probes on the webhook path.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookProbe {
    /// Always `true`; the endpoint answering is the signal.
    pub success: bool,
    /// Static description of the endpoint.
    pub message: String,
    /// Probe timestamp, RFC 3339.
    pub timestamp: String,
}

impl WebhookProbe {
    /// Build a probe answer stamped with the current time.
    pub fn now() -> Self {
        Self {
            success: true,
            message: "webhook endpoint is reachable".into(),
            timestamp: crate::dto::health::format_timestamp(std::time::SystemTime::now()),
        }
    }
}

/// Body of the test endpoint that synthesizes a webhook envelope without going
/// through the provider.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TestMessageRequest {
    /// Sender phone number. Omitting it exercises the missing-sender path.
    #[serde(default)]
    pub from: Option<String>,
    /// Message text.
    #[serde(default)]
    pub body: Option<String>,
    /// Alias for `body` accepted for convenience.
    #[serde(default)]
    pub message: Option<String>,
    /// Button id, for simulating interactive replies.
    #[serde(default)]
    pub button_id: Option<String>,
    /// Raw interactive object, passed through verbatim.
    #[serde(default)]
    pub interactive: Option<Value>,
}
