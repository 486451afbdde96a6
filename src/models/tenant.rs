//! Tenants and the user↔tenant association.

use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// A logically isolated customer organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
pub struct Tenant {
    /// Tenant ID.
    pub id: Uuid,
    /// Unique display name.
    pub name: String,
    /// Dedicated database schema name.
    pub schema_name: String,
    /// User who created the tenant.
    pub admin_id: Uuid,
    /// Creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Values for a tenant about to be created.
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub schema_name: String,
    pub admin_id: Uuid,
}

/// A tenant as seen by one of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
pub struct TenantMembership {
    pub tenant_id: Uuid,
    pub name: String,
    pub schema_name: String,
    /// Caller's role in the tenant.
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}

/// A member as seen from the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
pub struct TenantMember {
    pub user_id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    #[serde(with = "time::serde::rfc3339")]
    pub joined_at: OffsetDateTime,
}
