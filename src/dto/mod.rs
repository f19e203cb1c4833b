//! Request and response payloads exchanged over the HTTP API.

/// Health probe payloads.
pub mod health;
/// Invitation send and batch dispatch payloads.
pub mod invitations;
/// Webhook ingress payloads.
pub mod webhook;
