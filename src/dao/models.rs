use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Headcount used when a match does not specify its own target.
pub const DEFAULT_TARGET_COUNT: u32 = 4;

/// Lifecycle status of an invitation. The set is closed: no other value is
/// ever written by the application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    /// Created but not yet handed to the messaging provider.
    Pending,
    /// Delivered through the provider, awaiting a reply.
    Invited,
    /// The player accepted.
    Confirmed,
    /// The player declined.
    Declined,
    /// No answer arrived within the allowed window (operator flow).
    Timeout,
    /// Candidate queued to replace a decliner (operator flow).
    Backup,
}

impl InvitationStatus {
    /// Whether an inbound reply can still be resolved against this invitation.
    pub fn is_live(self) -> bool {
        matches!(self, InvitationStatus::Pending | InvitationStatus::Invited)
    }
}

/// Status of a scheduled match.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    /// Roster is still being filled.
    Open,
    /// Enough players confirmed; the roster is closed. Terminal.
    Locked,
    /// Cancelled by an operator.
    Cancelled,
}

/// One player's standing offer to join one match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvitationEntity {
    /// Stable identifier for the invitation.
    pub id: Uuid,
    /// Match this invitation fills a slot for.
    pub match_id: Uuid,
    /// Player the invitation is addressed to.
    pub player_id: Uuid,
    /// Current lifecycle status.
    pub status: InvitationStatus,
    /// Candidate promoted after an original invitee declined.
    pub is_backup: bool,
    /// Creation timestamp; replies resolve against the most recently created
    /// live invitation for the player.
    pub created_at: SystemTime,
    /// Set when the invitation message was handed to the provider.
    pub sent_at: Option<SystemTime>,
    /// Set exactly when the status transitions into confirmed or declined.
    pub responded_at: Option<SystemTime>,
    /// Provider-side identifier of the delivered message, for correlation
    /// with provider logs.
    pub provider_message_id: Option<String>,
}

impl InvitationEntity {
    /// Create a fresh pending invitation for a (match, player) pair.
    pub fn new(match_id: Uuid, player_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            match_id,
            player_id,
            status: InvitationStatus::Pending,
            is_backup: false,
            created_at: SystemTime::now(),
            sent_at: None,
            responded_at: None,
            provider_message_id: None,
        }
    }
}

/// A scheduled court session being filled with players.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Stable identifier for the match.
    pub id: Uuid,
    /// Display name used in invitation messages.
    pub name: String,
    /// When the session takes place.
    pub scheduled_at: Option<SystemTime>,
    /// Current match status.
    pub status: MatchStatus,
    /// Derived count of confirmed invitations; the confirmation aggregator is
    /// the sole writer of this field.
    pub confirmed_count: u32,
    /// Required headcount before the match auto-locks.
    pub target_count: u32,
    /// Set exactly once, when the match transitions into `Locked`.
    pub locked_at: Option<SystemTime>,
}

impl MatchEntity {
    /// Create an open match with the default target headcount.
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            scheduled_at: None,
            status: MatchStatus::Open,
            confirmed_count: 0,
            target_count: DEFAULT_TARGET_COUNT,
            locked_at: None,
        }
    }
}

/// A player known to the system, looked up by phone number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Stable identifier for the player.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Phone number as stored. Upstream providers are inconsistent about
    /// formatting, so lookups try several normalized variants.
    pub phone: String,
}
