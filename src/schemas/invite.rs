//! Invitation payloads.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use super::auth::{TokenResponse, UserOut};
use super::validation::normalize_email;
use crate::error::AppError;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct InviteCreate {
    pub email: String,
}

impl InviteCreate {
    pub fn validate(self) -> Result<Self, AppError> {
        Ok(Self {
            email: normalize_email(&self.email)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InviteCreated {
    pub invite_id: Uuid,
    pub email: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// Redeem an invitation. `password` is only needed for new accounts.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AcceptInviteRequest {
    pub token: String,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AcceptInviteResponse {
    pub user: UserOut,
    pub tokens: TokenResponse,
}
