//! Health probing over the installed record store.

use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe storage and provider wiring. Never fails; degraded components are
/// reported in the response body.
pub async fn probe(state: &SharedState) -> HealthResponse {
    let storage = match state.record_store().await {
        Some(store) => match store.health_check().await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "storage health check failed");
                false
            }
        },
        None => false,
    };

    HealthResponse::new(storage, state.provider().is_some())
}
