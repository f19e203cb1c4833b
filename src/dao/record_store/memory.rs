use std::{collections::HashMap, sync::Arc};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    models::{InvitationEntity, MatchEntity, PlayerEntity},
    record_store::RecordStore,
    storage::StorageResult,
};

/// Record store backend keeping everything in process memory.
///
/// Used by unit tests and by local runs where no MongoDB is configured. Data
/// does not survive a restart.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    invitations: HashMap<Uuid, InvitationEntity>,
    matches: HashMap<Uuid, MatchEntity>,
    players: HashMap<Uuid, PlayerEntity>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a player record. Player CRUD is an out-of-scope collaborator, so
    /// this only exists on the memory backend.
    pub async fn insert_player(&self, player: PlayerEntity) {
        let mut guard = self.inner.write().await;
        guard.players.insert(player.id, player);
    }

    /// Seed a match record.
    pub async fn insert_match(&self, entity: MatchEntity) {
        let mut guard = self.inner.write().await;
        guard.matches.insert(entity.id, entity);
    }
}

impl RecordStore for MemoryRecordStore {
    fn save_invitation(
        &self,
        invitation: InvitationEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut guard = store.inner.write().await;
            guard.invitations.insert(invitation.id, invitation);
            Ok(())
        })
    }

    fn find_invitation(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<InvitationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let guard = store.inner.read().await;
            Ok(guard.invitations.get(&id).cloned())
        })
    }

    fn live_invitations_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<InvitationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let guard = store.inner.read().await;
            Ok(guard
                .invitations
                .values()
                .filter(|invitation| {
                    invitation.player_id == player_id && invitation.status.is_live()
                })
                .cloned()
                .collect())
        })
    }

    fn find_live_invitation(
        &self,
        match_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<InvitationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let guard = store.inner.read().await;
            Ok(guard
                .invitations
                .values()
                .filter(|invitation| {
                    invitation.match_id == match_id
                        && invitation.player_id == player_id
                        && invitation.status.is_live()
                })
                .max_by_key(|invitation| invitation.created_at)
                .cloned())
        })
    }

    fn invitations_for_match(
        &self,
        match_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<InvitationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let guard = store.inner.read().await;
            Ok(guard
                .invitations
                .values()
                .filter(|invitation| invitation.match_id == match_id)
                .cloned()
                .collect())
        })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let guard = store.inner.read().await;
            Ok(guard.matches.get(&id).cloned())
        })
    }

    fn save_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let mut guard = store.inner.write().await;
            guard.matches.insert(entity.id, entity);
            Ok(())
        })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let guard = store.inner.read().await;
            Ok(guard.players.get(&id).cloned())
        })
    }

    fn find_player_by_phone(
        &self,
        phone: String,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let guard = store.inner.read().await;
            Ok(guard
                .players
                .values()
                .find(|player| player.phone == phone)
                .cloned())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
