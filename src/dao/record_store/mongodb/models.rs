use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{InvitationEntity, InvitationStatus, MatchEntity, MatchStatus,
    PlayerEntity};

/// Invitation document as stored in the `invitations` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoInvitationDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    match_id: Uuid,
    player_id: Uuid,
    status: InvitationStatus,
    #[serde(default)]
    is_backup: bool,
    created_at: DateTime,
    sent_at: Option<DateTime>,
    responded_at: Option<DateTime>,
    provider_message_id: Option<String>,
}

impl From<InvitationEntity> for MongoInvitationDocument {
    fn from(value: InvitationEntity) -> Self {
        Self {
            id: value.id,
            match_id: value.match_id,
            player_id: value.player_id,
            status: value.status,
            is_backup: value.is_backup,
            created_at: DateTime::from_system_time(value.created_at),
            sent_at: value.sent_at.map(DateTime::from_system_time),
            responded_at: value.responded_at.map(DateTime::from_system_time),
            provider_message_id: value.provider_message_id,
        }
    }
}

impl From<MongoInvitationDocument> for InvitationEntity {
    fn from(value: MongoInvitationDocument) -> Self {
        Self {
            id: value.id,
            match_id: value.match_id,
            player_id: value.player_id,
            status: value.status,
            is_backup: value.is_backup,
            created_at: value.created_at.to_system_time(),
            sent_at: value.sent_at.map(|at| at.to_system_time()),
            responded_at: value.responded_at.map(|at| at.to_system_time()),
            provider_message_id: value.provider_message_id,
        }
    }
}

/// Match document as stored in the `matches` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    scheduled_at: Option<DateTime>,
    status: MatchStatus,
    #[serde(default)]
    confirmed_count: u32,
    #[serde(default = "default_target_count")]
    target_count: u32,
    locked_at: Option<DateTime>,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            scheduled_at: value.scheduled_at.map(DateTime::from_system_time),
            status: value.status,
            confirmed_count: value.confirmed_count,
            target_count: value.target_count,
            locked_at: value.locked_at.map(DateTime::from_system_time),
        }
    }
}

impl From<MongoMatchDocument> for MatchEntity {
    fn from(value: MongoMatchDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            scheduled_at: value.scheduled_at.map(|at| at.to_system_time()),
            status: value.status,
            confirmed_count: value.confirmed_count,
            target_count: value.target_count,
            locked_at: value.locked_at.map(|at| at.to_system_time()),
        }
    }
}

/// Player document as stored in the `players` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    name: String,
    phone: String,
}

impl From<MongoPlayerDocument> for PlayerEntity {
    fn from(value: MongoPlayerDocument) -> Self {
        Self {
            id: value.id,
            name: value.name,
            phone: value.phone,
        }
    }
}

fn default_target_count() -> u32 {
    crate::dao::models::DEFAULT_TARGET_COUNT
}

/// Render a UUID the way serde writes it into documents, so filters and
/// stored values always compare equal.
pub fn uuid_field(id: Uuid) -> String {
    id.to_string()
}

/// Filter selecting a document by its UUID primary key.
pub fn doc_id(id: Uuid) -> Document {
    doc! { "_id": uuid_field(id) }
}

/// Filter fragment matching the live invitation statuses.
pub fn live_status_filter() -> Document {
    doc! { "$in": ["pending", "invited"] }
}
