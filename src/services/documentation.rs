use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Padel Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::webhook::receive_webhook,
        crate::routes::webhook::verify_webhook,
        crate::routes::webhook::test_message,
        crate::routes::invitations::send_invitation,
        crate::routes::invitations::send_batch,
        crate::routes::provider::register_webhook,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::webhook::WebhookAck,
            crate::dto::webhook::WebhookProbe,
            crate::dto::webhook::TestMessageRequest,
            crate::dto::invitations::BatchSendRequest,
            crate::dto::invitations::BatchSendResponse,
            crate::dto::invitations::RegisterWebhookRequest,
            crate::services::outbound_service::SendOutcome,
            crate::services::dispatch_service::DispatchResult,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "webhook", description = "Inbound message webhook"),
        (name = "invitations", description = "Outbound invitation delivery"),
        (name = "provider", description = "Messaging provider configuration"),
    )
)]
pub struct ApiDoc;
