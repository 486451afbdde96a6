//! Invitations to join a tenant.

use serde::Serialize;
use strum::{AsRefStr, Display, EnumString};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of an invitation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum InviteStatus {
    /// Waiting for the invitee.
    Pending,
    /// Redeemed.
    Accepted,
    /// Redeemed too late.
    Expired,
}

impl TryFrom<String> for InviteStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// An invitation for an email address to join a tenant.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Invite {
    pub id: Uuid,
    pub email: String,
    pub tenant_id: Uuid,
    pub invited_by: Uuid,
    pub token: String,
    #[sqlx(try_from = "String")]
    pub status: InviteStatus,
    pub expires_at: OffsetDateTime,
    pub accepted_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl Invite {
    /// Whether the invitation has run out at `now`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at < now
    }
}

/// Values for an invitation about to be stored.
#[derive(Debug, Clone)]
pub struct NewInvite {
    pub email: String,
    pub tenant_id: Uuid,
    pub invited_by: Uuid,
    pub token: String,
    pub expires_at: OffsetDateTime,
}
