//! Roles assigned to tenant memberships.

use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Built-in role held by tenant creators.
pub const ADMIN_ROLE: &str = "admin";
/// Built-in role given to invited users.
pub const MEMBER_ROLE: &str = "member";

/// A named role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
pub struct Role {
    pub id: Uuid,
    /// Unique role name.
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Role {
    /// Whether this is one of the seeded roles that must not change.
    pub fn is_builtin(&self) -> bool {
        is_builtin_role(&self.name)
    }
}

/// Whether `name` is one of the seeded roles.
pub fn is_builtin_role(name: &str) -> bool {
    name == ADMIN_ROLE || name == MEMBER_ROLE
}

/// Values for a role about to be created or replaced.
#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub description: Option<String>,
}
