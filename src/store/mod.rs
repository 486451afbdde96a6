//! Persistence.
//!
//! [`Store`] is the seam between the services and the database. It has two
//! implementations: [`PgStore`] over PostgreSQL and [`MemoryStore`] for tests
//! and local development. Tenant-owned lookups always take the tenant ID.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::{
    Agent, AgentChanges, CallSession, Invite, InviteStatus, NewAgent, NewCallSession, NewInvite,
    NewPasswordResetToken, NewRefreshToken, NewRole, NewTenant, NewUser, PasswordResetToken,
    RefreshToken, Role, Tenant, TenantMember, TenantMembership, User, Utterance,
};
use crate::schemas::CallSessionFilter;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Outcome of [`Store::change_member_role`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChange {
    /// The member now holds the role.
    Changed(TenantMember),
    /// The user is not a member of the tenant.
    NotMember,
    /// The change would leave the tenant without an admin.
    LastAdmin,
}

/// Storage operations used by the services.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip used by readiness checks.
    async fn ping(&self) -> StoreResult<()>;

    // === Users ===

    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn set_current_tenant(&self, user_id: Uuid, tenant_id: Option<Uuid>) -> StoreResult<()>;
    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> StoreResult<()>;

    // === Tenants & memberships ===

    /// Insert the tenant and make its admin a member with `admin_role_id`.
    /// The admin's current tenant is set when they have none.
    async fn create_tenant(&self, tenant: NewTenant, admin_role_id: Uuid) -> StoreResult<Tenant>;
    async fn get_tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>>;
    async fn tenant_name_exists(&self, name: &str) -> StoreResult<bool>;
    async fn schema_name_exists(&self, schema_name: &str) -> StoreResult<bool>;
    async fn list_user_tenants(&self, user_id: Uuid) -> StoreResult<Vec<TenantMembership>>;
    async fn list_tenant_members(&self, tenant_id: Uuid) -> StoreResult<Vec<TenantMember>>;
    /// Role the user holds in the tenant, `None` when not a member.
    async fn membership_role(&self, user_id: Uuid, tenant_id: Uuid) -> StoreResult<Option<Role>>;
    /// Insert or update the user's role in the tenant.
    async fn upsert_membership(&self, user_id: Uuid, tenant_id: Uuid, role_id: Uuid) -> StoreResult<()>;
    /// Give an existing member `role`, refusing to demote the tenant's last admin.
    /// The admin count and the update happen atomically.
    async fn change_member_role(&self, tenant_id: Uuid, user_id: Uuid, role: &Role) -> StoreResult<RoleChange>;

    // === Roles ===

    async fn create_role(&self, role: NewRole) -> StoreResult<Role>;
    async fn list_roles(&self, skip: i64, limit: i64) -> StoreResult<Vec<Role>>;
    async fn get_role(&self, id: Uuid) -> StoreResult<Option<Role>>;
    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;
    async fn update_role(&self, id: Uuid, role: NewRole) -> StoreResult<Option<Role>>;
    async fn delete_role(&self, id: Uuid) -> StoreResult<bool>;
    async fn role_in_use(&self, id: Uuid) -> StoreResult<bool>;

    // === Invitations ===

    async fn create_invite(&self, invite: NewInvite) -> StoreResult<Invite>;
    async fn find_pending_invite(&self, email: &str, tenant_id: Uuid) -> StoreResult<Option<Invite>>;
    async fn find_invite_by_token(&self, token: &str) -> StoreResult<Option<Invite>>;
    async fn set_invite_status(
        &self,
        id: Uuid,
        status: InviteStatus,
        accepted_at: Option<OffsetDateTime>,
    ) -> StoreResult<()>;
    async fn delete_invite(&self, id: Uuid) -> StoreResult<()>;

    // === Refresh & reset tokens ===

    async fn insert_refresh_token(&self, token: NewRefreshToken) -> StoreResult<RefreshToken>;
    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>>;
    /// Revoke one token, recording its successor when rotated.
    /// Returns `false` when the token was unknown or already revoked.
    async fn revoke_refresh_token(&self, token: &str, replaced_by: Option<&str>) -> StoreResult<bool>;
    async fn revoke_user_refresh_tokens(&self, user_id: Uuid) -> StoreResult<u64>;
    async fn insert_reset_token(&self, token: NewPasswordResetToken) -> StoreResult<PasswordResetToken>;
    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>>;
    /// Claim a reset token. Returns `false` when it was already used.
    async fn mark_reset_token_used(&self, id: Uuid) -> StoreResult<bool>;

    // === Agents ===

    async fn create_agent(&self, tenant_id: Uuid, agent: NewAgent) -> StoreResult<Agent>;
    async fn get_agent(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<Option<Agent>>;
    /// Page of agents ordered by creation, with the total matching count.
    /// `search` is a lowercase substring of the name.
    async fn list_agents(
        &self,
        tenant_id: Uuid,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<Agent>, i64)>;
    async fn update_agent(&self, id: Uuid, tenant_id: Uuid, changes: AgentChanges) -> StoreResult<Option<Agent>>;
    async fn delete_agent(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<bool>;

    // === Call sessions ===

    async fn create_call_session(&self, session: NewCallSession) -> StoreResult<CallSession>;
    async fn get_call_session(&self, id: Uuid) -> StoreResult<Option<CallSession>>;
    async fn find_call_session_by_sid(&self, call_sid: &str) -> StoreResult<Option<CallSession>>;
    /// Newest first, with the total matching count.
    async fn list_call_sessions(&self, filter: &CallSessionFilter) -> StoreResult<(Vec<CallSession>, i64)>;
    /// Append one utterance, leaving every other column alone.
    async fn append_utterance(&self, id: Uuid, utterance: &Utterance) -> StoreResult<Option<CallSession>>;
    /// Persist status, `end_time`, `duration` and `updated_at` of a session.
    async fn save_call_status(&self, session: &CallSession) -> StoreResult<Option<CallSession>>;
}
