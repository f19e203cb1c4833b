/// In-memory backend used by tests and storage-free local runs.
pub mod memory;
#[cfg(feature = "mongo-store")]
/// MongoDB backend.
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{InvitationEntity, MatchEntity, PlayerEntity};
use crate::dao::storage::StorageResult;

/// Abstraction over the persistence layer for invitations, matches, and
/// players. The confirmation pipeline only ever needs find/insert/update by id
/// and filter; everything richer lives outside this core.
pub trait RecordStore: Send + Sync {
    /// Insert or replace an invitation by id.
    fn save_invitation(&self, invitation: InvitationEntity)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch an invitation by id.
    fn find_invitation(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<InvitationEntity>>>;
    /// All invitations for a player that a reply can still resolve against
    /// (status pending or invited).
    fn live_invitations_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<InvitationEntity>>>;
    /// The live invitation for a (match, player) pair, if one exists.
    fn find_live_invitation(
        &self,
        match_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<InvitationEntity>>>;
    /// All invitations attached to a match.
    fn invitations_for_match(
        &self,
        match_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<InvitationEntity>>>;
    /// Fetch a match by id.
    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Insert or replace a match by id.
    fn save_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a player by id.
    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Fetch a player by an exact phone string.
    fn find_player_by_phone(
        &self,
        phone: String,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Cheap connectivity probe used by the health endpoint and supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
