use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use serde_json::Value;

use crate::{
    dto::webhook::{TestMessageRequest, WebhookAck, WebhookProbe},
    services::webhook_service,
    state::SharedState,
};

/// Routes handling inbound webhook deliveries from the messaging provider.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/webhooks/whatsapp",
            post(receive_webhook).get(verify_webhook),
        )
        .route("/webhooks/whatsapp/test", post(test_message))
}

/// Receive a webhook delivery.
///
/// Always answers 200: the provider retries non-2xx deliveries and neither a
/// bad token nor a malformed payload will get better on retry. The ack body
/// carries the real outcome.
#[utoipa::path(
    post,
    path = "/webhooks/whatsapp",
    tag = "webhook",
    request_body = Value,
    responses((status = 200, description = "Payload acknowledged", body = WebhookAck))
)]
pub async fn receive_webhook(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Json<WebhookAck> {
    if let Err(rejection) = webhook_service::verify_token(&state, &headers) {
        return Json(rejection);
    }
    let ack = webhook_service::process_payload(&state, &payload).await;
    Json(ack)
}

/// Verification probe some providers issue before accepting a webhook URL.
#[utoipa::path(
    get,
    path = "/webhooks/whatsapp",
    tag = "webhook",
    responses((status = 200, description = "Webhook endpoint is reachable", body = WebhookProbe))
)]
pub async fn verify_webhook() -> Json<WebhookProbe> {
    Json(WebhookProbe::now())
}

/// Feed a synthesized message through the webhook pipeline, bypassing the
/// token check. For manual verification only.
#[utoipa::path(
    post,
    path = "/webhooks/whatsapp/test",
    tag = "webhook",
    request_body = TestMessageRequest,
    responses((status = 200, description = "Synthesized payload processed", body = WebhookAck))
)]
pub async fn test_message(
    State(state): State<SharedState>,
    Json(request): Json<TestMessageRequest>,
) -> Json<WebhookAck> {
    let ack = webhook_service::process_test_message(&state, request).await;
    Json(ack)
}
