//! Batch invitation dispatch with bounded concurrency.
//!
//! A fixed pool of workers pulls player ids off a shared cursor, so at most
//! [`MAX_CONCURRENT_SENDS`] provider calls are in flight at once. Every input
//! slot gets a result in input order; one failing send never aborts the rest.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    services::outbound_service::{self, SendOutcome},
    state::SharedState,
};

/// Upper bound on provider calls in flight during a batch.
pub const MAX_CONCURRENT_SENDS: usize = 3;

/// Per-player result of a batch dispatch, in input order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DispatchResult {
    /// Invitation the send was attempted for. Absent when creating the
    /// invitation itself failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation_id: Option<Uuid>,
    /// Player this slot belongs to.
    pub player_id: Uuid,
    /// Whether the invitation was delivered.
    pub success: bool,
    /// Failure detail when it was not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Dispatch invitations for a match to every listed player.
///
/// Configuration problems (missing provider, degraded storage, unknown match)
/// propagate as errors before any work starts; per-player failures land in
/// their result slot instead.
pub async fn dispatch_batch(
    state: &SharedState,
    match_id: Uuid,
    player_ids: Vec<Uuid>,
) -> Result<Vec<DispatchResult>, ServiceError> {
    let store = state.require_record_store().await?;
    state.require_provider()?;
    state.provider_account_id()?;
    store
        .find_match(match_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("match `{match_id}`")))?;

    let total = player_ids.len();
    info!(%match_id, players = total, "dispatching invitation batch");

    let inputs = Arc::new(player_ids);
    let cursor = Arc::new(AtomicUsize::new(0));
    let slots: Arc<Mutex<Vec<Option<DispatchResult>>>> =
        Arc::new(Mutex::new(vec![None; total]));

    let worker_count = MAX_CONCURRENT_SENDS.min(total);
    let mut workers = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let state = state.clone();
        let inputs = inputs.clone();
        let cursor = cursor.clone();
        let slots = slots.clone();
        workers.push(tokio::spawn(async move {
            loop {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(player_id) = inputs.get(index).copied() else {
                    break;
                };
                let result = dispatch_one(&state, match_id, player_id).await;
                if let Ok(mut guard) = slots.lock() {
                    guard[index] = Some(result);
                }
            }
        }));
    }

    for worker in workers {
        if let Err(err) = worker.await {
            warn!(error = %err, "dispatch worker panicked");
        }
    }

    let mut guard = slots
        .lock()
        .map_err(|_| ServiceError::InvalidInput("dispatch slots poisoned".into()))?;
    let results: Vec<DispatchResult> = guard
        .iter_mut()
        .enumerate()
        .map(|(index, slot)| {
            slot.take().unwrap_or_else(|| DispatchResult {
                invitation_id: None,
                player_id: inputs[index],
                success: false,
                error: Some("send was not attempted".into()),
            })
        })
        .collect();

    let delivered = results.iter().filter(|result| result.success).count();
    info!(%match_id, delivered, failed = total - delivered, "batch dispatch finished");
    Ok(results)
}

/// Create-or-reuse the invitation for one player and attempt delivery. All
/// failures collapse into the result slot.
async fn dispatch_one(state: &SharedState, match_id: Uuid, player_id: Uuid) -> DispatchResult {
    let store = match state.require_record_store().await {
        Ok(store) => store,
        Err(err) => return failure(None, player_id, err.to_string()),
    };

    let invitation = match outbound_service::ensure_invitation(&store, match_id, player_id).await {
        Ok(invitation) => invitation,
        Err(err) => return failure(None, player_id, err.to_string()),
    };

    match outbound_service::send_invitation(state, invitation.id).await {
        Ok(SendOutcome {
            success, error, ..
        }) => DispatchResult {
            invitation_id: Some(invitation.id),
            player_id,
            success,
            error,
        },
        Err(err) => failure(Some(invitation.id), player_id, err.to_string()),
    }
}

fn failure(invitation_id: Option<Uuid>, player_id: Uuid, error: String) -> DispatchResult {
    DispatchResult {
        invitation_id,
        player_id,
        success: false,
        error: Some(error),
    }
}
