//! Application-level configuration assembled from the process environment.
//!
//! Values are read once in `main` and handed to components at construction so
//! services never reach for global state; tests build configs directly.

use std::env;

use tracing::{info, warn};

/// Env var carrying the provider API credential.
const TOKEN_ENV: &str = "WHATSAPP_API_TOKEN";
/// Env var overriding the provider API base URL.
const BASE_URL_ENV: &str = "WHATSAPP_API_BASE_URL";
/// Env var naming the provider account used for outbound sends.
const ACCOUNT_ID_ENV: &str = "WHATSAPP_ACCOUNT_ID";
/// Env var carrying the shared secret expected on inbound webhooks.
const WEBHOOK_SECRET_ENV: &str = "WEBHOOK_SECRET";
/// Env var carrying the public URL registered with the provider.
const PUBLIC_WEBHOOK_URL_ENV: &str = "PUBLIC_WEBHOOK_URL";

/// Base URL used when the environment does not override it.
const DEFAULT_BASE_URL: &str = "https://api.whatsapp-gateway.local/v1";

/// Connection settings for the messaging provider API.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API credential sent in the `token` header.
    pub token: String,
    /// Base URL of the provider API.
    pub base_url: String,
    /// Identifier of the WhatsApp account to send from.
    pub account_id: String,
}

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Provider settings; `None` when no API token is configured. Outbound
    /// sends then fail with a configuration error on first use.
    pub provider: Option<ProviderConfig>,
    /// Shared secret inbound webhooks must present. `None` disables the check.
    pub webhook_secret: Option<String>,
    /// Publicly reachable webhook URL to register with the provider.
    pub public_webhook_url: Option<String>,
}

impl AppConfig {
    /// Assemble the configuration from environment variables.
    pub fn from_env() -> Self {
        let provider = match non_empty_var(TOKEN_ENV) {
            Some(token) => {
                let base_url =
                    non_empty_var(BASE_URL_ENV).unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
                let account_id = non_empty_var(ACCOUNT_ID_ENV).unwrap_or_default();
                info!(base_url = %base_url, "provider API configured");
                Some(ProviderConfig {
                    token,
                    base_url,
                    account_id,
                })
            }
            None => {
                warn!(
                    var = TOKEN_ENV,
                    "provider API token not set; outbound sends will fail until configured"
                );
                None
            }
        };

        let webhook_secret = non_empty_var(WEBHOOK_SECRET_ENV);
        if webhook_secret.is_none() {
            warn!(
                var = WEBHOOK_SECRET_ENV,
                "webhook secret not set; inbound webhooks are unauthenticated"
            );
        }

        Self {
            provider,
            webhook_secret,
            public_webhook_url: non_empty_var(PUBLIC_WEBHOOK_URL_ENV),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
