//! Invitation state machine and confirmation aggregator.
//!
//! A resolved YES/NO decision transitions the sender's most recently created
//! live invitation to confirmed or declined, then recomputes the match's
//! confirmed headcount and applies the auto-lock rule.

use std::{sync::Arc, time::SystemTime};

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{InvitationEntity, InvitationStatus, MatchEntity, MatchStatus, PlayerEntity},
        record_store::RecordStore,
    },
    error::ServiceError,
    services::inbound::Decision,
    state::SharedState,
};

/// Result of resolving a decision against the invitation records.
///
/// `PlayerNotFound` and `NoPendingInvitation` are valid outcomes of stale or
/// duplicate replies, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// The invitation was confirmed.
    Confirmed(InvitationEntity),
    /// The invitation was declined.
    Declined(InvitationEntity),
    /// No player matched any normalized form of the sender phone.
    PlayerNotFound,
    /// The player has no live invitation to resolve the reply against.
    NoPendingInvitation,
}

/// Apply an inbound decision from the given sender phone.
pub async fn apply_reply(
    state: &SharedState,
    sender_phone: &str,
    decision: Decision,
) -> Result<ReplyOutcome, ServiceError> {
    let store = state.require_record_store().await?;

    let Some(player) = find_player_by_phone(&store, sender_phone).await? else {
        return Ok(ReplyOutcome::PlayerNotFound);
    };

    let Some(invitation) = latest_live_invitation(&store, player.id).await? else {
        return Ok(ReplyOutcome::NoPendingInvitation);
    };

    let outcome = resolve_invitation(&store, invitation, decision).await?;
    Ok(outcome)
}

/// Transition a live invitation according to the decision, stamp
/// `responded_at`, and run the aggregator for its match.
pub async fn resolve_invitation(
    store: &Arc<dyn RecordStore>,
    mut invitation: InvitationEntity,
    decision: Decision,
) -> Result<ReplyOutcome, ServiceError> {
    invitation.status = match decision {
        Decision::Yes => InvitationStatus::Confirmed,
        Decision::No => InvitationStatus::Declined,
    };
    invitation.responded_at = Some(SystemTime::now());
    store.save_invitation(invitation.clone()).await?;

    info!(
        invitation_id = %invitation.id,
        match_id = %invitation.match_id,
        status = ?invitation.status,
        "invitation resolved"
    );

    recompute_match(store, invitation.match_id).await?;

    Ok(match decision {
        Decision::Yes => ReplyOutcome::Confirmed(invitation),
        Decision::No => ReplyOutcome::Declined(invitation),
    })
}

/// Recompute a match's confirmed headcount from the full invitation set and
/// lock the match once the target is reached.
///
/// Idempotent: the count is recomputed from scratch rather than incremented,
/// and an already locked match is never re-locked.
pub async fn recompute_match(
    store: &Arc<dyn RecordStore>,
    match_id: Uuid,
) -> Result<Option<MatchEntity>, ServiceError> {
    let Some(mut entity) = store.find_match(match_id).await? else {
        warn!(%match_id, "aggregator skipped: match not found");
        return Ok(None);
    };

    let invitations = store.invitations_for_match(match_id).await?;
    let confirmed = invitations
        .iter()
        .filter(|invitation| invitation.status == InvitationStatus::Confirmed)
        .count() as u32;

    entity.confirmed_count = confirmed;
    if confirmed >= entity.target_count && entity.status != MatchStatus::Locked {
        entity.status = MatchStatus::Locked;
        entity.locked_at = Some(SystemTime::now());
        info!(%match_id, confirmed, target = entity.target_count, "match locked");
    }

    store.save_match(entity.clone()).await?;
    Ok(Some(entity))
}

/// Look up a player trying the literal phone string, the digits-only form, and
/// the digits-only form with a leading `+`.
pub async fn find_player_by_phone(
    store: &Arc<dyn RecordStore>,
    raw_phone: &str,
) -> Result<Option<PlayerEntity>, ServiceError> {
    for variant in phone_variants(raw_phone) {
        if let Some(player) = store.find_player_by_phone(variant).await? {
            return Ok(Some(player));
        }
    }
    Ok(None)
}

/// Normalized lookup forms for an inbound phone value, most specific first.
pub fn phone_variants(raw: &str) -> Vec<String> {
    let literal = raw.trim().to_owned();
    let digits: String = literal.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut variants = vec![literal];
    if !digits.is_empty() {
        variants.push(digits.clone());
        variants.push(format!("+{digits}"));
    }
    variants.dedup();
    variants
}

async fn latest_live_invitation(
    store: &Arc<dyn RecordStore>,
    player_id: Uuid,
) -> Result<Option<InvitationEntity>, ServiceError> {
    let live = store.live_invitations_for_player(player_id).await?;
    Ok(live
        .into_iter()
        .max_by_key(|invitation| invitation.created_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::{
        config::AppConfig,
        dao::{
            models::{InvitationEntity, MatchEntity, PlayerEntity},
            record_store::memory::MemoryRecordStore,
        },
        state::{AppState, SharedState},
    };

    fn test_config() -> AppConfig {
        AppConfig {
            provider: None,
            webhook_secret: None,
            public_webhook_url: None,
        }
    }

    async fn setup() -> (SharedState, Arc<dyn RecordStore>, MemoryRecordStore) {
        let memory = MemoryRecordStore::new();
        let store: Arc<dyn RecordStore> = Arc::new(memory.clone());
        let state = AppState::new(test_config(), None);
        state.install_record_store(store.clone()).await;
        (state, store, memory)
    }

    fn player(phone: &str) -> PlayerEntity {
        PlayerEntity {
            id: Uuid::new_v4(),
            name: "Test Player".into(),
            phone: phone.into(),
        }
    }

    fn invited(match_id: Uuid, player_id: Uuid, age: Duration) -> InvitationEntity {
        let mut invitation = InvitationEntity::new(match_id, player_id);
        invitation.status = InvitationStatus::Invited;
        invitation.created_at = SystemTime::now() - age;
        invitation
    }

    #[tokio::test]
    async fn yes_reply_confirms_latest_live_invitation() {
        let (state, store, memory) = setup().await;
        let player = player("+966512345678");
        let entity = MatchEntity::new("Friday night".into());
        memory.insert_player(player.clone()).await;
        memory.insert_match(entity.clone()).await;

        let invitation = invited(entity.id, player.id, Duration::from_secs(60));
        store.save_invitation(invitation.clone()).await.unwrap();

        let outcome = apply_reply(&state, "966512345678", Decision::Yes)
            .await
            .unwrap();
        let ReplyOutcome::Confirmed(resolved) = outcome else {
            panic!("expected confirmation, got {outcome:?}");
        };
        assert_eq!(resolved.id, invitation.id);
        assert_eq!(resolved.status, InvitationStatus::Confirmed);
        assert!(resolved.responded_at.is_some());

        let updated = store.find_match(entity.id).await.unwrap().unwrap();
        assert_eq!(updated.confirmed_count, 1);
        assert_eq!(updated.status, MatchStatus::Open);
    }

    #[tokio::test]
    async fn no_reply_declines_and_stamps_responded_at() {
        let (state, store, memory) = setup().await;
        let player = player("+966512345678");
        let entity = MatchEntity::new("Friday night".into());
        memory.insert_player(player.clone()).await;
        memory.insert_match(entity.clone()).await;
        store
            .save_invitation(invited(entity.id, player.id, Duration::from_secs(10)))
            .await
            .unwrap();

        let outcome = apply_reply(&state, "+966512345678", Decision::No)
            .await
            .unwrap();
        let ReplyOutcome::Declined(resolved) = outcome else {
            panic!("expected decline, got {outcome:?}");
        };
        assert_eq!(resolved.status, InvitationStatus::Declined);
        assert!(resolved.responded_at.is_some());

        let updated = store.find_match(entity.id).await.unwrap().unwrap();
        assert_eq!(updated.confirmed_count, 0);
    }

    #[tokio::test]
    async fn reply_resolves_most_recent_invitation_across_matches() {
        let (state, store, memory) = setup().await;
        let player = player("966512345678");
        memory.insert_player(player.clone()).await;

        let older_match = MatchEntity::new("older".into());
        let newer_match = MatchEntity::new("newer".into());
        memory.insert_match(older_match.clone()).await;
        memory.insert_match(newer_match.clone()).await;

        let older = invited(older_match.id, player.id, Duration::from_secs(3600));
        let newer = invited(newer_match.id, player.id, Duration::from_secs(60));
        store.save_invitation(older.clone()).await.unwrap();
        store.save_invitation(newer.clone()).await.unwrap();

        let outcome = apply_reply(&state, "966512345678", Decision::Yes)
            .await
            .unwrap();
        let ReplyOutcome::Confirmed(resolved) = outcome else {
            panic!("expected confirmation, got {outcome:?}");
        };
        assert_eq!(resolved.id, newer.id, "the newest live invitation wins");

        // The older invitation stays live and untouched.
        let untouched = store.find_invitation(older.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, InvitationStatus::Invited);
    }

    #[tokio::test]
    async fn phone_lookup_tries_normalized_variants() {
        let (state, store, memory) = setup().await;
        let player = player("+966512345678");
        let entity = MatchEntity::new("m".into());
        memory.insert_player(player.clone()).await;
        memory.insert_match(entity.clone()).await;
        store
            .save_invitation(invited(entity.id, player.id, Duration::from_secs(1)))
            .await
            .unwrap();

        // Digits-only inbound value with stray formatting resolves the stored
        // `+`-prefixed record.
        let outcome = apply_reply(&state, " 966 51-234-5678 ", Decision::Yes)
            .await
            .unwrap();
        assert!(matches!(outcome, ReplyOutcome::Confirmed(_)));
    }

    #[test]
    fn phone_variants_cover_literal_digits_and_plus() {
        let variants = phone_variants("+966 512 345 678");
        assert_eq!(
            variants,
            vec![
                "+966 512 345 678".to_owned(),
                "966512345678".to_owned(),
                "+966512345678".to_owned(),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_phone_reports_player_not_found() {
        let (state, _store, _memory) = setup().await;
        let outcome = apply_reply(&state, "15550001111", Decision::Yes)
            .await
            .unwrap();
        assert_eq!(outcome, ReplyOutcome::PlayerNotFound);
    }

    #[tokio::test]
    async fn resolved_player_without_live_invitation_is_not_an_error() {
        let (state, store, memory) = setup().await;
        let player = player("15550001111");
        let entity = MatchEntity::new("m".into());
        memory.insert_player(player.clone()).await;
        memory.insert_match(entity.clone()).await;

        // Already-resolved invitation: a duplicate reply has nothing to act on.
        let mut done = invited(entity.id, player.id, Duration::from_secs(5));
        done.status = InvitationStatus::Confirmed;
        store.save_invitation(done).await.unwrap();

        let outcome = apply_reply(&state, "15550001111", Decision::Yes)
            .await
            .unwrap();
        assert_eq!(outcome, ReplyOutcome::NoPendingInvitation);
    }

    #[tokio::test]
    async fn aggregator_locks_match_at_target_count() {
        let (state, store, memory) = setup().await;
        let mut entity = MatchEntity::new("m".into());
        entity.target_count = 2;
        memory.insert_match(entity.clone()).await;

        for index in 0..2 {
            let player = player(&format!("96650000000{index}"));
            memory.insert_player(player.clone()).await;
            store
                .save_invitation(invited(entity.id, player.id, Duration::from_secs(5)))
                .await
                .unwrap();
            apply_reply(&state, &player.phone, Decision::Yes)
                .await
                .unwrap();
        }

        let locked = store.find_match(entity.id).await.unwrap().unwrap();
        assert_eq!(locked.confirmed_count, 2);
        assert_eq!(locked.status, MatchStatus::Locked);
        assert!(locked.locked_at.is_some());
    }

    #[tokio::test]
    async fn aggregator_is_idempotent_and_locks_once() {
        let (_state, store, memory) = setup().await;
        let mut entity = MatchEntity::new("m".into());
        entity.target_count = 1;
        memory.insert_match(entity.clone()).await;

        let player = player("966500000001");
        memory.insert_player(player.clone()).await;
        let mut invitation = invited(entity.id, player.id, Duration::from_secs(5));
        invitation.status = InvitationStatus::Confirmed;
        store.save_invitation(invitation).await.unwrap();

        let first = recompute_match(&store, entity.id).await.unwrap().unwrap();
        assert_eq!(first.status, MatchStatus::Locked);
        let locked_at = first.locked_at;
        assert!(locked_at.is_some());

        // Second run with no intervening change: same count, same lock stamp.
        let second = recompute_match(&store, entity.id).await.unwrap().unwrap();
        assert_eq!(second.confirmed_count, first.confirmed_count);
        assert_eq!(second.locked_at, locked_at);
    }

    #[tokio::test]
    async fn aggregator_recounts_from_scratch() {
        let (_state, store, memory) = setup().await;
        let mut entity = MatchEntity::new("m".into());
        // Simulate a hand-edited stale counter; the aggregator must overwrite it.
        entity.confirmed_count = 7;
        memory.insert_match(entity.clone()).await;

        let recomputed = recompute_match(&store, entity.id).await.unwrap().unwrap();
        assert_eq!(recomputed.confirmed_count, 0);
    }

    #[tokio::test]
    async fn aggregator_skips_missing_match() {
        let (_state, store, _memory) = setup().await;
        let result = recompute_match(&store, Uuid::new_v4()).await.unwrap();
        assert!(result.is_none());
    }
}
