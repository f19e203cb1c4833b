//! Provider-side configuration: webhook registration.

use tracing::{info, warn};

use crate::{error::ServiceError, state::SharedState};

/// Register the inbound webhook URL with the provider, passing the shared
/// token so deliveries can be authenticated.
///
/// When `url` is absent the configured public webhook URL is used.
pub async fn register_webhook(
    state: &SharedState,
    url: Option<String>,
) -> Result<String, ServiceError> {
    let provider = state.require_provider()?;
    let url = url
        .or_else(|| state.config().public_webhook_url.clone())
        .ok_or_else(|| {
            ServiceError::InvalidInput("no webhook URL given and none configured".into())
        })?;

    let token = state.config().webhook_secret.clone();
    provider
        .register_webhook(url.clone(), token)
        .await
        .map_err(|err| {
            warn!(error = %err, %url, "webhook registration failed");
            ServiceError::Configuration(format!("webhook registration failed: {err}"))
        })?;

    info!(%url, "webhook registered with provider");
    Ok(url)
}

/// Startup-time registration: best effort, logged and forgotten. The endpoint
/// stays available for manual retries.
pub async fn register_webhook_at_startup(state: SharedState) {
    if state.config().public_webhook_url.is_none() {
        return;
    }
    if let Err(err) = register_webhook(&state, None).await {
        warn!(error = %err, "startup webhook registration failed");
    }
}
