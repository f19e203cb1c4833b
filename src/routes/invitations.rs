use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::invitations::{BatchSendRequest, BatchSendResponse},
    error::AppError,
    services::{
        dispatch_service,
        outbound_service::{self, SendOutcome},
    },
    state::SharedState,
};

/// Routes handling outbound invitation delivery.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/invitations/{id}/send", post(send_invitation))
        .route("/invitations/batch", post(send_batch))
}

/// Send (or resend) the invitation message for one invitation.
#[utoipa::path(
    post,
    path = "/invitations/{id}/send",
    tag = "invitations",
    params(("id" = String, Path, description = "Identifier of the invitation to send")),
    responses(
        (status = 200, description = "Delivery attempted", body = SendOutcome),
        (status = 404, description = "Invitation, player, or match not found"),
        (status = 503, description = "Storage unavailable"),
    )
)]
pub async fn send_invitation(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SendOutcome>, AppError> {
    let outcome = outbound_service::send_invitation(&state, id).await?;
    Ok(Json(outcome))
}

/// Dispatch invitations for a match to a list of players with bounded
/// concurrency. One result per player, in request order.
#[utoipa::path(
    post,
    path = "/invitations/batch",
    tag = "invitations",
    request_body = BatchSendRequest,
    responses(
        (status = 200, description = "Batch dispatched", body = BatchSendResponse),
        (status = 400, description = "Empty player list"),
        (status = 404, description = "Match not found"),
        (status = 503, description = "Storage unavailable"),
    )
)]
pub async fn send_batch(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<BatchSendRequest>>,
) -> Result<Json<BatchSendResponse>, AppError> {
    let results =
        dispatch_service::dispatch_batch(&state, request.match_id, request.player_ids).await?;
    Ok(Json(BatchSendResponse::from_results(results)))
}
