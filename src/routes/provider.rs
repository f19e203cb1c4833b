use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::invitations::RegisterWebhookRequest,
    error::AppError,
    services::provider_service,
    state::SharedState,
};

/// Routes handling provider-side configuration.
pub fn router() -> Router<SharedState> {
    Router::new().route("/provider/webhook/register", post(register_webhook))
}

/// Register the inbound webhook URL with the messaging provider.
#[utoipa::path(
    post,
    path = "/provider/webhook/register",
    tag = "provider",
    request_body = RegisterWebhookRequest,
    responses(
        (status = 200, description = "Webhook registered", body = String),
        (status = 400, description = "No URL given and none configured"),
        (status = 500, description = "Provider not configured or registration failed"),
    )
)]
pub async fn register_webhook(
    State(state): State<SharedState>,
    Json(request): Json<RegisterWebhookRequest>,
) -> Result<Json<String>, AppError> {
    let url = provider_service::register_webhook(&state, request.url).await?;
    Ok(Json(url))
}
