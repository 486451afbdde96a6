//! User accounts.

use time::OffsetDateTime;
use uuid::Uuid;

/// A user account. Users may belong to several tenants.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    /// Lowercased, unique.
    pub email: String,
    pub phone: Option<String>,
    pub hashed_password: String,
    /// Tenant selected by the last login or switch.
    pub current_tenant_id: Option<Uuid>,
    pub join_date: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl User {
    /// "First Last".
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Values for a user about to be created.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub hashed_password: String,
    pub current_tenant_id: Option<Uuid>,
}
