/// HTTP client for the WhatsApp messaging provider.
pub mod client;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::WhatsappClient;

/// Convenient result alias returning [`ProviderError`] failures.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Transport-level failures while talking to the messaging provider.
///
/// Application-level rejections (a parsed response with `status != "success"`)
/// are not errors at this layer; callers inspect [`SendResponse::is_success`]
/// and decide whether to fall back.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build provider HTTP client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// A request could not be sent or timed out.
    #[error("failed to send provider request to `{path}`")]
    RequestSend {
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// The provider answered with an unexpected HTTP status.
    #[error("unexpected provider response status {status} for `{path}`")]
    RequestStatus {
        path: &'static str,
        status: reqwest::StatusCode,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode provider response for `{path}`")]
    DecodeResponse {
        path: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Decision reply buttons attached to an interactive invitation message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReplyButton {
    /// Opaque id returned verbatim in the webhook when the button is tapped.
    pub id: String,
    /// Label shown to the player.
    pub title: String,
}

/// Outbound message handed to the provider: either plain text or text with
/// tappable reply buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Plain text body.
    Text {
        /// Message body.
        body: String,
    },
    /// Interactive button message.
    Interactive {
        /// Message body shown above the buttons.
        body: String,
        /// Reply buttons, in display order.
        buttons: Vec<ReplyButton>,
    },
}

/// Parsed body of a `POST /messages/send` response. The provider signals
/// success in the body even on HTTP 200, so the status string is authoritative.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SendResponse {
    /// `"success"` on acceptance; anything else is an application-level error.
    #[serde(default)]
    pub status: String,
    /// Provider-side identifier of the queued message.
    #[serde(default)]
    pub message_id: Option<String>,
    /// Human-readable detail accompanying a rejection.
    #[serde(default)]
    pub message: Option<String>,
}

impl SendResponse {
    /// Whether the provider accepted the message.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// One WhatsApp account configured on the provider side.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderAccount {
    /// Account identifier matched against the configured account id.
    pub id: String,
    /// Whether the account is connected and able to send.
    #[serde(default)]
    pub ready: bool,
}

/// Seam over the provider HTTP API so services can be exercised against a
/// scripted fake in tests.
pub trait MessagingProvider: Send + Sync {
    /// Deliver a message to a normalized phone number.
    fn send_message(
        &self,
        to: String,
        message: OutboundMessage,
    ) -> BoxFuture<'static, ProviderResult<SendResponse>>;
    /// List the accounts configured on the provider.
    fn list_accounts(&self) -> BoxFuture<'static, ProviderResult<Vec<ProviderAccount>>>;
    /// Register the inbound webhook URL and shared token with the provider.
    fn register_webhook(
        &self,
        url: String,
        token: Option<String>,
    ) -> BoxFuture<'static, ProviderResult<()>>;
}
