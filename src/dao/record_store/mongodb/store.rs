use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Client, Collection, Database, bson::doc, options::IndexOptions};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoInvitationDocument, MongoMatchDocument, MongoPlayerDocument, doc_id,
        live_status_filter, uuid_field,
    },
};
use crate::dao::{
    models::{InvitationEntity, MatchEntity, PlayerEntity},
    record_store::RecordStore,
    storage::StorageResult,
};

const INVITATION_COLLECTION: &str = "invitations";
const MATCH_COLLECTION: &str = "matches";
const PLAYER_COLLECTION: &str = "players";

/// MongoDB-backed record store for invitations, matches, and players.
#[derive(Clone)]
pub struct MongoRecordStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }
}

impl MongoRecordStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        // Inbound replies resolve invitations by (player_id, status) and the
        // batch path looks them up by (match_id, player_id).
        let invitations = database.collection::<mongodb::bson::Document>(INVITATION_COLLECTION);
        for (keys, name, index) in [
            (
                doc! {"player_id": 1, "status": 1},
                "invitation_player_status_idx".to_owned(),
                "player_id,status",
            ),
            (
                doc! {"match_id": 1, "player_id": 1},
                "invitation_match_player_idx".to_owned(),
                "match_id,player_id",
            ),
        ] {
            let model = mongodb::IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(Some(name)).build())
                .build();
            invitations
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: INVITATION_COLLECTION,
                    index,
                    source,
                })?;
        }

        let players = database.collection::<mongodb::bson::Document>(PLAYER_COLLECTION);
        let phone_index = mongodb::IndexModel::builder()
            .keys(doc! {"phone": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("player_phone_idx".to_owned()))
                    .build(),
            )
            .build();
        players
            .create_index(phone_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION,
                index: "phone",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn invitation_collection(&self) -> Collection<MongoInvitationDocument> {
        self.database()
            .await
            .collection::<MongoInvitationDocument>(INVITATION_COLLECTION)
    }

    async fn match_collection(&self) -> Collection<MongoMatchDocument> {
        self.database()
            .await
            .collection::<MongoMatchDocument>(MATCH_COLLECTION)
    }

    async fn player_collection(&self) -> Collection<MongoPlayerDocument> {
        self.database()
            .await
            .collection::<MongoPlayerDocument>(PLAYER_COLLECTION)
    }

    async fn save_invitation(&self, invitation: InvitationEntity) -> MongoResult<()> {
        let id = invitation.id;
        let document: MongoInvitationDocument = invitation.into();
        let collection = self.invitation_collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveInvitation { id, source })?;
        Ok(())
    }

    async fn find_invitation(&self, id: Uuid) -> MongoResult<Option<InvitationEntity>> {
        let collection = self.invitation_collection().await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadInvitation { source })?;
        Ok(document.map(Into::into))
    }

    async fn query_invitations(
        &self,
        filter: mongodb::bson::Document,
    ) -> MongoResult<Vec<InvitationEntity>> {
        let collection = self.invitation_collection().await;
        let documents: Vec<MongoInvitationDocument> = collection
            .find(filter)
            .await
            .map_err(|source| MongoDaoError::QueryInvitations { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::QueryInvitations { source })?;
        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn save_match(&self, entity: MatchEntity) -> MongoResult<()> {
        let id = entity.id;
        let document: MongoMatchDocument = entity.into();
        let collection = self.match_collection().await;
        collection
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveMatch { id, source })?;
        Ok(())
    }

    async fn find_match(&self, id: Uuid) -> MongoResult<Option<MatchEntity>> {
        let collection = self.match_collection().await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadMatch { id, source })?;
        Ok(document.map(Into::into))
    }

    async fn find_player(&self, id: Uuid) -> MongoResult<Option<PlayerEntity>> {
        let collection = self.player_collection().await;
        let document = collection
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadPlayer { source })?;
        Ok(document.map(Into::into))
    }

    async fn find_player_by_phone(&self, phone: &str) -> MongoResult<Option<PlayerEntity>> {
        let collection = self.player_collection().await;
        let document = collection
            .find_one(doc! { "phone": phone })
            .await
            .map_err(|source| MongoDaoError::LoadPlayer { source })?;
        Ok(document.map(Into::into))
    }
}

impl RecordStore for MongoRecordStore {
    fn save_invitation(
        &self,
        invitation: InvitationEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_invitation(invitation).await.map_err(Into::into) })
    }

    fn find_invitation(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<InvitationEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_invitation(id).await.map_err(Into::into) })
    }

    fn live_invitations_for_player(
        &self,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<InvitationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .query_invitations(doc! {
                    "player_id": uuid_field(player_id),
                    "status": live_status_filter(),
                })
                .await
                .map_err(Into::into)
        })
    }

    fn find_live_invitation(
        &self,
        match_id: Uuid,
        player_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<InvitationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let invitations = store
                .query_invitations(doc! {
                    "match_id": uuid_field(match_id),
                    "player_id": uuid_field(player_id),
                    "status": live_status_filter(),
                })
                .await?;
            Ok(invitations
                .into_iter()
                .max_by_key(|invitation| invitation.created_at))
        })
    }

    fn invitations_for_match(
        &self,
        match_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<InvitationEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .query_invitations(doc! { "match_id": uuid_field(match_id) })
                .await
                .map_err(Into::into)
        })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_match(id).await.map_err(Into::into) })
    }

    fn save_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_match(entity).await.map_err(Into::into) })
    }

    fn find_player(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_player(id).await.map_err(Into::into) })
    }

    fn find_player_by_phone(
        &self,
        phone: String,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_player_by_phone(&phone).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }
}
