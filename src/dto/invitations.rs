//! Invitation send and batch dispatch payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::services::dispatch_service::DispatchResult;

/// Body of a batch dispatch request.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BatchSendRequest {
    /// Match the invitations belong to.
    pub match_id: Uuid,
    /// Players to invite, in the order results are reported.
    #[validate(length(min = 1, message = "player_ids must not be empty"))]
    pub player_ids: Vec<Uuid>,
}

/// Response of a batch dispatch, one entry per requested player.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchSendResponse {
    /// Per-player results in request order.
    pub results: Vec<DispatchResult>,
    /// Number of successful sends.
    pub delivered: usize,
    /// Number of failed sends.
    pub failed: usize,
}

impl BatchSendResponse {
    /// Build the response from dispatch results.
    pub fn from_results(results: Vec<DispatchResult>) -> Self {
        let delivered = results.iter().filter(|result| result.success).count();
        let failed = results.len() - delivered;
        Self {
            results,
            delivered,
            failed,
        }
    }
}

/// Body of a webhook registration request. When `url` is omitted the
/// configured public webhook URL is used.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterWebhookRequest {
    /// Publicly reachable URL the provider should deliver webhooks to.
    #[serde(default)]
    pub url: Option<String>,
}
