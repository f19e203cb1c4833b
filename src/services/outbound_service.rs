//! Outbound invitation delivery through the messaging provider.
//!
//! Interactive button messages are attempted first; when that attempt is
//! rejected or fails in transit, the send falls back exactly once to a plain
//! text rendition with reply instructions appended.

use std::{sync::Arc, time::SystemTime};

use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dao::{
        models::{InvitationEntity, InvitationStatus, MatchEntity, PlayerEntity},
        record_store::RecordStore,
    },
    error::ServiceError,
    provider::{MessagingProvider, OutboundMessage, ReplyButton},
    state::SharedState,
};

/// Instructions appended to the plain-text fallback rendition.
const FALLBACK_INSTRUCTIONS: &str = "Reply YES to confirm or NO to decline.";

/// Per-invitation delivery result. Failures are data, not errors, so one bad
/// send never aborts its batch siblings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SendOutcome {
    /// Whether the provider accepted the message.
    pub success: bool,
    /// Provider-side message id on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Failure detail when the send did not go through.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SendOutcome {
    fn delivered(message_id: Option<String>) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

/// Send the invitation message for an existing invitation.
///
/// Missing configuration propagates as an error; provider rejections and
/// transport failures are reported in the returned [`SendOutcome`].
pub async fn send_invitation(
    state: &SharedState,
    invitation_id: Uuid,
) -> Result<SendOutcome, ServiceError> {
    let store = state.require_record_store().await?;
    let provider = state.require_provider()?;
    let account_id = state.provider_account_id()?;

    let invitation = store
        .find_invitation(invitation_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("invitation `{invitation_id}`")))?;
    let player = store
        .find_player(invitation.player_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("player `{}`", invitation.player_id)))?;
    let entity = store
        .find_match(invitation.match_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("match `{}`", invitation.match_id)))?;

    if let Some(outcome) = verify_account(&provider, &account_id).await {
        return Ok(outcome);
    }

    let outcome = deliver_invitation(&provider, &player, &entity, &invitation).await;
    if outcome.success {
        mark_invited(&store, invitation, outcome.message_id.clone()).await?;
    }
    Ok(outcome)
}

/// Find the live invitation for a (match, player) pair, or create a fresh
/// pending one. Reuse keeps resends from spawning duplicate live invitations.
pub async fn ensure_invitation(
    store: &Arc<dyn RecordStore>,
    match_id: Uuid,
    player_id: Uuid,
) -> Result<InvitationEntity, ServiceError> {
    if let Some(existing) = store.find_live_invitation(match_id, player_id).await? {
        return Ok(existing);
    }
    let invitation = InvitationEntity::new(match_id, player_id);
    store.save_invitation(invitation.clone()).await?;
    Ok(invitation)
}

/// Best-effort payment link message after a confirmation. Delivery failure is
/// logged, never surfaced to the webhook caller.
pub async fn send_payment_link(state: &SharedState, invitation: &InvitationEntity) {
    let Some(provider) = state.provider() else {
        warn!(invitation_id = %invitation.id, "payment link skipped: no provider configured");
        return;
    };
    let store = match state.require_record_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(invitation_id = %invitation.id, error = %err, "payment link skipped");
            return;
        }
    };
    let player = match store.find_player(invitation.player_id).await {
        Ok(Some(player)) => player,
        Ok(None) => {
            warn!(invitation_id = %invitation.id, "payment link skipped: player not found");
            return;
        }
        Err(err) => {
            warn!(invitation_id = %invitation.id, error = %err, "payment link skipped");
            return;
        }
    };

    let body = format!(
        "You're in! Please settle your share here: {}",
        payment_link_for(invitation.id)
    );
    match provider
        .send_message(normalize_msisdn(&player.phone), OutboundMessage::Text { body })
        .await
    {
        Ok(response) if response.is_success() => {
            info!(invitation_id = %invitation.id, "payment link sent");
        }
        Ok(response) => {
            warn!(
                invitation_id = %invitation.id,
                detail = response.message.as_deref().unwrap_or("rejected"),
                "payment link rejected by provider"
            );
        }
        Err(err) => {
            warn!(invitation_id = %invitation.id, error = %err, "payment link send failed");
        }
    }
}

/// Best-effort acknowledgement after a decline.
pub async fn send_decline_message(state: &SharedState, invitation: &InvitationEntity) {
    let Some(provider) = state.provider() else {
        return;
    };
    let store = match state.require_record_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(invitation_id = %invitation.id, error = %err, "decline message skipped");
            return;
        }
    };
    let Ok(Some(player)) = store.find_player(invitation.player_id).await else {
        warn!(invitation_id = %invitation.id, "decline message skipped: player not found");
        return;
    };

    let body = "No problem, thanks for letting us know. See you next time!".to_owned();
    if let Err(err) = provider
        .send_message(normalize_msisdn(&player.phone), OutboundMessage::Text { body })
        .await
    {
        warn!(invitation_id = %invitation.id, error = %err, "decline message send failed");
    }
}

/// Payment settlement link for a confirmed invitation. Link generation lives
/// in an external service keyed by invitation id.
fn payment_link_for(invitation_id: Uuid) -> String {
    format!("https://pay.padel.local/invitations/{invitation_id}")
}

/// Check the configured account exists and is ready to send. Returns a failure
/// outcome when it is not; `None` means the send may proceed.
async fn verify_account(
    provider: &Arc<dyn MessagingProvider>,
    account_id: &str,
) -> Option<SendOutcome> {
    let accounts = match provider.list_accounts().await {
        Ok(accounts) => accounts,
        Err(err) => {
            warn!(error = %err, "account verification failed");
            return Some(SendOutcome::failed(format!(
                "account verification failed: {err}"
            )));
        }
    };

    match accounts.iter().find(|account| account.id == account_id) {
        Some(account) if account.ready => None,
        Some(_) => Some(SendOutcome::failed(format!(
            "account `{account_id}` is not ready"
        ))),
        None => Some(SendOutcome::failed(format!(
            "account `{account_id}` not found on provider"
        ))),
    }
}

/// Attempt the interactive rendition, falling back exactly once to plain text
/// when the provider rejects it or the request fails at transport level. A
/// failed fallback is never retried.
async fn deliver_invitation(
    provider: &Arc<dyn MessagingProvider>,
    player: &PlayerEntity,
    entity: &MatchEntity,
    invitation: &InvitationEntity,
) -> SendOutcome {
    let to = normalize_msisdn(&player.phone);
    let body = invitation_body(player, entity);
    let interactive = OutboundMessage::Interactive {
        body: body.clone(),
        buttons: decision_buttons(invitation.id),
    };

    match provider.send_message(to.clone(), interactive).await {
        Ok(response) if response.is_success() => {
            info!(invitation_id = %invitation.id, "interactive invitation sent");
            return SendOutcome::delivered(response.message_id);
        }
        Ok(response) => {
            warn!(
                invitation_id = %invitation.id,
                detail = response.message.as_deref().unwrap_or("rejected"),
                "interactive send rejected, falling back to text"
            );
        }
        Err(err) => {
            warn!(
                invitation_id = %invitation.id,
                error = %err,
                "interactive send failed, falling back to text"
            );
        }
    }

    let fallback = OutboundMessage::Text {
        body: format!("{body}\n\n{FALLBACK_INSTRUCTIONS}"),
    };
    match provider.send_message(to, fallback).await {
        Ok(response) if response.is_success() => {
            info!(invitation_id = %invitation.id, "text fallback invitation sent");
            SendOutcome::delivered(response.message_id)
        }
        Ok(response) => SendOutcome::failed(
            response
                .message
                .unwrap_or_else(|| "provider rejected the message".into()),
        ),
        Err(err) => SendOutcome::failed(err.to_string()),
    }
}

/// Recipient form the provider expects: digits only, no `+`, no whitespace.
fn normalize_msisdn(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '+')
        .collect()
}

fn invitation_body(player: &PlayerEntity, entity: &MatchEntity) -> String {
    format!(
        "Hi {}! You're invited to play padel: {}. Are you in?",
        player.name, entity.name
    )
}

fn decision_buttons(invitation_id: Uuid) -> Vec<ReplyButton> {
    vec![
        ReplyButton {
            id: format!("yes_{invitation_id}"),
            title: "Yes, I'm in".into(),
        },
        ReplyButton {
            id: format!("no_{invitation_id}"),
            title: "No, can't make it".into(),
        },
    ]
}

async fn mark_invited(
    store: &Arc<dyn RecordStore>,
    mut invitation: InvitationEntity,
    message_id: Option<String>,
) -> Result<(), ServiceError> {
    invitation.status = InvitationStatus::Invited;
    invitation.sent_at = Some(SystemTime::now());
    invitation.provider_message_id = message_id;
    store.save_invitation(invitation).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use futures::future::BoxFuture;

    use crate::{
        config::{AppConfig, ProviderConfig},
        dao::record_store::memory::MemoryRecordStore,
        provider::{ProviderAccount, ProviderError, ProviderResult, SendResponse},
        state::AppState,
    };

    /// Scripted provider returning canned responses per send, in order.
    struct FakeProvider {
        responses: Mutex<Vec<ProviderResult<SendResponse>>>,
        sent: Mutex<Vec<(String, OutboundMessage)>>,
        accounts: Vec<ProviderAccount>,
    }

    impl FakeProvider {
        fn new(responses: Vec<ProviderResult<SendResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                sent: Mutex::new(Vec::new()),
                accounts: vec![ProviderAccount {
                    id: "acct-1".into(),
                    ready: true,
                }],
            })
        }

        fn with_accounts(
            responses: Vec<ProviderResult<SendResponse>>,
            accounts: Vec<ProviderAccount>,
        ) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                sent: Mutex::new(Vec::new()),
                accounts,
            })
        }

        fn sent_messages(&self) -> Vec<(String, OutboundMessage)> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl MessagingProvider for FakeProvider {
        fn send_message(
            &self,
            to: String,
            message: OutboundMessage,
        ) -> BoxFuture<'static, ProviderResult<SendResponse>> {
            self.sent.lock().unwrap().push((to, message));
            let next = self.responses.lock().unwrap().remove(0);
            Box::pin(async move { next })
        }

        fn list_accounts(&self) -> BoxFuture<'static, ProviderResult<Vec<ProviderAccount>>> {
            let accounts = self.accounts.clone();
            Box::pin(async move { Ok(accounts) })
        }

        fn register_webhook(
            &self,
            _url: String,
            _token: Option<String>,
        ) -> BoxFuture<'static, ProviderResult<()>> {
            Box::pin(async move { Ok(()) })
        }
    }

    fn accepted(message_id: &str) -> ProviderResult<SendResponse> {
        Ok(SendResponse {
            status: "success".into(),
            message_id: Some(message_id.into()),
            message: None,
        })
    }

    fn rejected(detail: &str) -> ProviderResult<SendResponse> {
        Ok(SendResponse {
            status: "error".into(),
            message_id: None,
            message: Some(detail.into()),
        })
    }

    fn transport_error() -> ProviderResult<SendResponse> {
        Err(ProviderError::RequestStatus {
            path: "messages/send",
            status: reqwest::StatusCode::BAD_GATEWAY,
        })
    }

    fn test_config() -> AppConfig {
        AppConfig {
            provider: Some(ProviderConfig {
                token: "t".into(),
                base_url: "https://provider.test/v1".into(),
                account_id: "acct-1".into(),
            }),
            webhook_secret: None,
            public_webhook_url: None,
        }
    }

    async fn seeded_state(
        provider: Arc<FakeProvider>,
    ) -> (SharedState, Arc<dyn RecordStore>, InvitationEntity) {
        let memory = MemoryRecordStore::new();
        let store: Arc<dyn RecordStore> = Arc::new(memory.clone());
        let state = AppState::new(test_config(), Some(provider));
        state.install_record_store(store.clone()).await;

        let player = PlayerEntity {
            id: Uuid::new_v4(),
            name: "Sara".into(),
            phone: "+966512345678".into(),
        };
        let entity = MatchEntity::new("Tuesday 8pm".into());
        memory.insert_player(player.clone()).await;
        memory.insert_match(entity.clone()).await;

        let invitation = InvitationEntity::new(entity.id, player.id);
        store.save_invitation(invitation.clone()).await.unwrap();
        (state, store, invitation)
    }

    #[tokio::test]
    async fn interactive_send_marks_invitation_invited() {
        let provider = FakeProvider::new(vec![accepted("msg-1")]);
        let (state, store, invitation) = seeded_state(provider.clone()).await;

        let outcome = send_invitation(&state, invitation.id).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message_id.as_deref(), Some("msg-1"));

        let stored = store.find_invitation(invitation.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvitationStatus::Invited);
        assert!(stored.sent_at.is_some());
        assert_eq!(stored.provider_message_id.as_deref(), Some("msg-1"));

        let sent = provider.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "966512345678", "recipient is normalized");
        assert!(matches!(sent[0].1, OutboundMessage::Interactive { .. }));
    }

    #[tokio::test]
    async fn rejected_interactive_falls_back_to_text_once() {
        let provider = FakeProvider::new(vec![rejected("buttons unsupported"), accepted("msg-2")]);
        let (state, store, invitation) = seeded_state(provider.clone()).await;

        let outcome = send_invitation(&state, invitation.id).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message_id.as_deref(), Some("msg-2"));

        let sent = provider.sent_messages();
        assert_eq!(sent.len(), 2, "exactly one fallback attempt");
        assert!(matches!(sent[0].1, OutboundMessage::Interactive { .. }));
        let OutboundMessage::Text { body } = &sent[1].1 else {
            panic!("fallback should be plain text");
        };
        assert!(body.contains("Reply YES to confirm or NO to decline."));

        let stored = store.find_invitation(invitation.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvitationStatus::Invited);
    }

    #[tokio::test]
    async fn rejected_fallback_reports_failure_without_state_change() {
        let provider = FakeProvider::new(vec![rejected("nope"), rejected("still nope")]);
        let (state, store, invitation) = seeded_state(provider.clone()).await;

        let outcome = send_invitation(&state, invitation.id).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("still nope"));
        assert_eq!(provider.sent_messages().len(), 2);

        let stored = store.find_invitation(invitation.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvitationStatus::Pending);
        assert!(stored.sent_at.is_none());
    }

    #[tokio::test]
    async fn transport_error_also_triggers_the_fallback_once() {
        let provider = FakeProvider::new(vec![transport_error(), accepted("msg-3")]);
        let (state, store, invitation) = seeded_state(provider.clone()).await;

        let outcome = send_invitation(&state, invitation.id).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.message_id.as_deref(), Some("msg-3"));
        assert_eq!(provider.sent_messages().len(), 2);

        let stored = store.find_invitation(invitation.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvitationStatus::Invited);
    }

    #[tokio::test]
    async fn failed_fallback_after_transport_error_is_final() {
        let provider = FakeProvider::new(vec![transport_error(), transport_error()]);
        let (state, store, invitation) = seeded_state(provider.clone()).await;

        let outcome = send_invitation(&state, invitation.id).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(provider.sent_messages().len(), 2, "fallback is never retried");

        let stored = store.find_invitation(invitation.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InvitationStatus::Pending);
    }

    #[test]
    fn msisdn_normalization_strips_plus_and_whitespace() {
        assert_eq!(normalize_msisdn("+966 51 234 5678"), "966512345678");
        assert_eq!(normalize_msisdn("966512345678"), "966512345678");
    }

    #[tokio::test]
    async fn unready_account_fails_the_send_without_attempting_delivery() {
        let provider = FakeProvider::with_accounts(
            vec![],
            vec![ProviderAccount {
                id: "acct-1".into(),
                ready: false,
            }],
        );
        let (state, _store, invitation) = seeded_state(provider.clone()).await;

        let outcome = send_invitation(&state, invitation.id).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("not ready"));
        assert!(provider.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn missing_account_fails_the_send() {
        let provider = FakeProvider::with_accounts(
            vec![],
            vec![ProviderAccount {
                id: "other".into(),
                ready: true,
            }],
        );
        let (state, _store, invitation) = seeded_state(provider.clone()).await;

        let outcome = send_invitation(&state, invitation.id).await.unwrap();
        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn unknown_invitation_is_not_found() {
        let provider = FakeProvider::new(vec![]);
        let (state, _store, _invitation) = seeded_state(provider).await;

        let err = send_invitation(&state, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn ensure_invitation_reuses_live_and_creates_fresh() {
        let provider = FakeProvider::new(vec![]);
        let (_state, store, invitation) = seeded_state(provider).await;

        let reused = ensure_invitation(&store, invitation.match_id, invitation.player_id)
            .await
            .unwrap();
        assert_eq!(reused.id, invitation.id);

        let other_player = Uuid::new_v4();
        let fresh = ensure_invitation(&store, invitation.match_id, other_player)
            .await
            .unwrap();
        assert_ne!(fresh.id, invitation.id);
        assert_eq!(fresh.status, InvitationStatus::Pending);
    }

    #[tokio::test]
    async fn interactive_buttons_carry_invitation_scoped_ids() {
        let provider = FakeProvider::new(vec![accepted("msg-1")]);
        let (state, _store, invitation) = seeded_state(provider.clone()).await;

        send_invitation(&state, invitation.id).await.unwrap();

        let sent = provider.sent_messages();
        let OutboundMessage::Interactive { buttons, .. } = &sent[0].1 else {
            panic!("expected interactive message");
        };
        assert_eq!(buttons[0].id, format!("yes_{}", invitation.id));
        assert_eq!(buttons[1].id, format!("no_{}", invitation.id));
    }
}
