//! Tenant payloads.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::validation::required_text;
use crate::error::AppError;
use crate::models::Tenant;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TenantCreate {
    pub name: String,
}

impl TenantCreate {
    pub fn validate(self) -> Result<Self, AppError> {
        Ok(Self {
            name: required_text("name", &self.name, 255)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TenantCreateResponse {
    pub tenant_id: Uuid,
    pub message: String,
    pub tenant: Tenant,
}

/// Change a member's role.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MemberRoleUpdate {
    pub role_name: String,
}
