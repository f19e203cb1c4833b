//! Health probe payloads.

use std::time::SystemTime;

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use utoipa::ToSchema;

/// Health probe response.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok` when storage is reachable, `degraded` otherwise.
    pub status: String,
    /// Whether the record store is currently installed and answering pings.
    pub storage: bool,
    /// Whether a provider client is configured.
    pub provider: bool,
    /// Probe timestamp, RFC 3339.
    pub timestamp: String,
}

impl HealthResponse {
    /// Build a probe response for the given component states.
    pub fn new(storage: bool, provider: bool) -> Self {
        Self {
            status: if storage { "ok" } else { "degraded" }.to_owned(),
            storage,
            provider,
            timestamp: format_timestamp(SystemTime::now()),
        }
    }
}

/// RFC 3339 rendition of a system time, falling back to the unix-epoch debug
/// form when the conversion is out of range.
pub fn format_timestamp(at: SystemTime) -> String {
    let datetime = OffsetDateTime::from(at);
    datetime
        .format(&Rfc3339)
        .unwrap_or_else(|_| format!("{datetime:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degraded_without_storage() {
        let response = HealthResponse::new(false, true);
        assert_eq!(response.status, "degraded");
        assert!(response.provider);
    }

    #[test]
    fn timestamp_is_rfc3339() {
        let rendered = format_timestamp(SystemTime::UNIX_EPOCH);
        assert_eq!(rendered, "1970-01-01T00:00:00Z");
    }
}
