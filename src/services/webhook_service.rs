//! Webhook ingress: authentication, redacted logging, and reply processing.
//!
//! Once a payload is authenticated, content problems never produce an error
//! status. The provider retries non-2xx deliveries, and a malformed payload
//! will not get better on retry, so everything is acknowledged with HTTP 200
//! and the ack body carries the real outcome.

use axum::http::HeaderMap;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::{
    dto::webhook::{TestMessageRequest, WebhookAck},
    redact::redact_payload,
    services::{
        confirmation_service::{self, ReplyOutcome},
        inbound::{self, InterpretOutcome},
        outbound_service,
    },
    state::SharedState,
};

/// Header names the shared webhook token is accepted under.
const TOKEN_HEADERS: &[&str] = &["webhook-token", "webhook_token", "x-webhook-token"];

/// Verify the shared webhook token when one is configured.
///
/// A mismatch is still acknowledged with HTTP 200 so the provider does not
/// retry the delivery; the ack body reports the rejection.
pub fn verify_token(state: &SharedState, headers: &HeaderMap) -> Result<(), WebhookAck> {
    let Some(expected) = state.config().webhook_secret.as_deref() else {
        return Ok(());
    };

    let presented = TOKEN_HEADERS
        .iter()
        .find_map(|name| headers.get(*name).and_then(|value| value.to_str().ok()));

    match presented {
        Some(token) if token == expected => Ok(()),
        Some(_) => {
            warn!("webhook delivery with an invalid token");
            Err(WebhookAck::rejected("invalid webhook token"))
        }
        None => {
            warn!("webhook delivery without a token");
            Err(WebhookAck::rejected("missing webhook token"))
        }
    }
}

/// Process an authenticated webhook payload into an acknowledgement.
pub async fn process_payload(state: &SharedState, payload: &Value) -> WebhookAck {
    debug!(payload = %redact_payload(payload), "webhook payload received");

    let message = match inbound::interpret(payload) {
        InterpretOutcome::Message(message) => message,
        InterpretOutcome::OwnMessage => {
            return WebhookAck::ok("own message ignored");
        }
        InterpretOutcome::IgnoredEvent(event) => {
            debug!(%event, "non-message event ignored");
            return WebhookAck::ok(format!("event `{event}` ignored"));
        }
        InterpretOutcome::MissingSender => {
            warn!("webhook payload has no resolvable sender");
            return WebhookAck::rejected("no sender phone in payload");
        }
        InterpretOutcome::MissingContent => {
            warn!("webhook payload has no message content");
            return WebhookAck::rejected("no message content in payload");
        }
    };

    let Some(decision) = message.decision else {
        info!(
            sender = %message.sender_phone,
            text = %message.raw_text,
            "reply did not map to a decision"
        );
        return WebhookAck::ok("message received, no decision recognized");
    };

    match confirmation_service::apply_reply(state, &message.sender_phone, decision).await {
        Ok(ReplyOutcome::Confirmed(invitation)) => {
            outbound_service::send_payment_link(state, &invitation).await;
            WebhookAck::ok("invitation confirmed")
        }
        Ok(ReplyOutcome::Declined(invitation)) => {
            outbound_service::send_decline_message(state, &invitation).await;
            WebhookAck::ok("invitation declined")
        }
        Ok(ReplyOutcome::PlayerNotFound) => {
            warn!(sender = %message.sender_phone, "reply from unknown phone");
            WebhookAck::rejected("no player matches the sender phone")
        }
        Ok(ReplyOutcome::NoPendingInvitation) => {
            info!(sender = %message.sender_phone, "reply without a live invitation");
            WebhookAck::ok("no pending invitation for this player")
        }
        Err(err) => {
            warn!(error = %err, "reply processing failed");
            WebhookAck::rejected(format!("processing failed: {err}"))
        }
    }
}

/// Synthesize a webhook envelope from a test request and run it through the
/// regular pipeline. Bypasses the token check; meant for manual verification.
pub async fn process_test_message(state: &SharedState, request: TestMessageRequest) -> WebhookAck {
    let mut payload = json!({});
    if let Some(from) = request.from {
        payload["from"] = Value::String(from);
    }
    if let Some(body) = request.body.or(request.message) {
        payload["body"] = Value::String(body);
    }
    if let Some(button_id) = request.button_id {
        payload["button_id"] = Value::String(button_id);
    }
    if let Some(interactive) = request.interactive {
        payload["interactive"] = interactive;
    }

    process_payload(state, &payload).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, time::SystemTime};

    use uuid::Uuid;

    use crate::{
        config::AppConfig,
        dao::{
            models::{InvitationEntity, InvitationStatus, MatchEntity, PlayerEntity},
            record_store::{RecordStore, memory::MemoryRecordStore},
        },
        state::{AppState, SharedState},
    };

    fn config_with_secret(secret: Option<&str>) -> AppConfig {
        AppConfig {
            provider: None,
            webhook_secret: secret.map(str::to_owned),
            public_webhook_url: None,
        }
    }

    #[test]
    fn token_check_passes_when_no_secret_is_configured() {
        let state = AppState::new(config_with_secret(None), None);
        assert!(verify_token(&state, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn token_check_accepts_any_known_header_name() {
        let state = AppState::new(config_with_secret(Some("s3cret")), None);
        for name in ["webhook-token", "webhook_token", "x-webhook-token"] {
            let mut headers = HeaderMap::new();
            headers.insert(name, "s3cret".parse().unwrap());
            assert!(verify_token(&state, &headers).is_ok(), "header `{name}`");
        }
    }

    #[test]
    fn token_check_rejects_missing_and_wrong_tokens() {
        let state = AppState::new(config_with_secret(Some("s3cret")), None);
        let ack = verify_token(&state, &HeaderMap::new()).unwrap_err();
        assert!(!ack.success);
        assert!(ack.message.contains("missing"));

        let mut headers = HeaderMap::new();
        headers.insert("webhook-token", "wrong".parse().unwrap());
        let ack = verify_token(&state, &headers).unwrap_err();
        assert!(!ack.success);
        assert!(ack.message.contains("invalid"));
    }

    async fn seeded_state() -> (SharedState, Arc<dyn RecordStore>, MatchEntity, PlayerEntity) {
        let memory = MemoryRecordStore::new();
        let store: Arc<dyn RecordStore> = Arc::new(memory.clone());
        let state = AppState::new(config_with_secret(None), None);
        state.install_record_store(store.clone()).await;

        let player = PlayerEntity {
            id: Uuid::new_v4(),
            name: "Omar".into(),
            phone: "966512345678".into(),
        };
        let entity = MatchEntity::new("Thursday".into());
        memory.insert_player(player.clone()).await;
        memory.insert_match(entity.clone()).await;

        let mut invitation = InvitationEntity::new(entity.id, player.id);
        invitation.status = InvitationStatus::Invited;
        invitation.sent_at = Some(SystemTime::now());
        store.save_invitation(invitation).await.unwrap();

        (state, store, entity, player)
    }

    #[tokio::test]
    async fn yes_reply_confirms_through_the_full_pipeline() {
        let (state, store, entity, player) = seeded_state().await;
        let payload = serde_json::json!({ "from": player.phone, "body": "yes" });

        let ack = process_payload(&state, &payload).await;
        assert!(ack.success, "{}", ack.message);

        let updated = store.find_match(entity.id).await.unwrap().unwrap();
        assert_eq!(updated.confirmed_count, 1);
    }

    #[tokio::test]
    async fn unknown_sender_is_rejected_in_the_ack_body() {
        let (state, _store, _entity, _player) = seeded_state().await;
        let payload = serde_json::json!({ "from": "15550009999", "body": "yes" });

        let ack = process_payload(&state, &payload).await;
        assert!(!ack.success);
        assert!(ack.message.contains("no player"));
    }

    #[tokio::test]
    async fn own_messages_and_events_ack_successfully() {
        let (state, _store, _entity, _player) = seeded_state().await;

        let own = serde_json::json!({ "from": "1", "body": "yes", "fromMe": true });
        assert!(process_payload(&state, &own).await.success);

        let event = serde_json::json!({ "event": "message_ack", "from": "1" });
        assert!(process_payload(&state, &event).await.success);
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_but_acknowledged() {
        let (state, _store, _entity, _player) = seeded_state().await;

        let no_sender = serde_json::json!({ "body": "yes" });
        let ack = process_payload(&state, &no_sender).await;
        assert!(!ack.success);

        let no_content = serde_json::json!({ "from": "966512345678" });
        let ack = process_payload(&state, &no_content).await;
        assert!(!ack.success);
    }

    #[tokio::test]
    async fn degraded_storage_is_reported_in_the_ack() {
        let state = AppState::new(config_with_secret(None), None);
        let payload = serde_json::json!({ "from": "966512345678", "body": "yes" });

        let ack = process_payload(&state, &payload).await;
        assert!(!ack.success);
        assert!(ack.message.contains("processing failed"));
    }

    #[tokio::test]
    async fn test_endpoint_synthesizes_a_button_reply() {
        let (state, store, entity, player) = seeded_state().await;
        let request = TestMessageRequest {
            from: Some(player.phone.clone()),
            body: None,
            message: None,
            button_id: Some("CONFIRM_YES".into()),
            interactive: None,
        };

        let ack = process_test_message(&state, request).await;
        assert!(ack.success, "{}", ack.message);

        let updated = store.find_match(entity.id).await.unwrap().unwrap();
        assert_eq!(updated.confirmed_count, 1);
    }
}
