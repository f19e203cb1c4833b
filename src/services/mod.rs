/// Invitation state machine and confirmation aggregator.
pub mod confirmation_service;
/// Batch invitation dispatch with bounded concurrency.
pub mod dispatch_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Inbound message interpretation.
pub mod inbound;
/// Outbound invitation delivery.
pub mod outbound_service;
/// Provider-side configuration.
pub mod provider_service;
/// Webhook ingress processing.
pub mod webhook_service;
