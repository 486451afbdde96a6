//! Authentication payloads.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

use super::validation::{check_password, normalize_email, optional_text, required_text};
use crate::error::AppError;
use crate::models::User;

/// Self-service sign-up.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

impl RegisterRequest {
    /// Normalise fields and check constraints.
    pub fn validate(self) -> Result<Self, AppError> {
        check_password(&self.password)?;
        Ok(Self {
            first_name: required_text("first_name", &self.first_name, 100)?,
            last_name: required_text("last_name", &self.last_name, 100)?,
            email: normalize_email(&self.email)?,
            phone: optional_text("phone", self.phone, 50)?,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SwitchTenantRequest {
    pub tenant_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Issued credentials.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always "bearer".
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user_id: Uuid,
    pub email: String,
    /// Tenant the access token is scoped to.
    pub tenant_id: Option<Uuid>,
    /// Every tenant the user belongs to.
    pub tenant_ids: Vec<Uuid>,
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserOut {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub current_tenant_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub join_date: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            current_tenant_id: user.current_tenant_id,
            join_date: user.join_date,
            created_at: user.created_at,
        }
    }
}
