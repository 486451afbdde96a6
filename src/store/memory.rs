//! In-memory [`Store`] for tests and `serve --in-memory`.

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RoleChange, Store};
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Agent, AgentChanges, CallSession, CallStatus, Invite, InviteStatus, NewAgent, NewCallSession,
    NewInvite, NewPasswordResetToken, NewRefreshToken, NewRole, NewTenant, NewUser,
    PasswordResetToken, RefreshToken, Role, Tenant, TenantMember, TenantMembership, User,
    Utterance, ADMIN_ROLE, MEMBER_ROLE,
};
use crate::schemas::CallSessionFilter;

#[derive(Debug, Clone)]
struct Membership {
    user_id: Uuid,
    tenant_id: Uuid,
    role_id: Uuid,
    joined_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    tenants: Vec<Tenant>,
    memberships: Vec<Membership>,
    roles: Vec<Role>,
    invites: Vec<Invite>,
    refresh_tokens: Vec<RefreshToken>,
    reset_tokens: Vec<PasswordResetToken>,
    agents: Vec<Agent>,
    call_sessions: Vec<CallSession>,
}

impl Tables {
    fn member(&self, m: &Membership) -> Option<TenantMember> {
        let user = self.users.iter().find(|u| u.id == m.user_id)?;
        let role = self.role(m.role_id)?;
        Some(TenantMember {
            user_id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            role: role.name.clone(),
            joined_at: m.joined_at,
        })
    }

    fn is_admin(&self, m: &Membership) -> bool {
        self.role(m.role_id).is_some_and(|r| r.name == ADMIN_ROLE)
    }

    fn role(&self, id: Uuid) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: constraint.to_string(),
    }
}

fn foreign_key(constraint: &str) -> StoreError {
    StoreError::ForeignKeyViolation {
        constraint: constraint.to_string(),
    }
}

/// Process-local store; contents vanish with the process.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store seeded with the built-in roles.
    pub fn new() -> Self {
        let now = OffsetDateTime::now_utc();
        let seeded = [
            (ADMIN_ROLE, "Tenant administrator"),
            (MEMBER_ROLE, "Tenant member"),
        ]
        .into_iter()
        .map(|(name, description)| Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: Some(description.to_string()),
            created_at: now,
        })
        .collect();

        Self {
            tables: RwLock::new(Tables {
                roles: seeded,
                ..Default::default()
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.email == user.email) {
            return Err(unique("users_email_key"));
        }
        let now = OffsetDateTime::now_utc();
        let record = User {
            id: Uuid::new_v4(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone: user.phone,
            hashed_password: user.hashed_password,
            current_tenant_id: user.current_tenant_id,
            join_date: now,
            created_at: now,
        };
        t.users.push(record.clone());
        Ok(record)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn set_current_tenant(&self, user_id: Uuid, tenant_id: Option<Uuid>) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if let Some(user) = t.users.iter_mut().find(|u| u.id == user_id) {
            user.current_tenant_id = tenant_id;
        }
        Ok(())
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if let Some(user) = t.users.iter_mut().find(|u| u.id == user_id) {
            user.hashed_password = hashed_password.to_string();
        }
        Ok(())
    }

    async fn create_tenant(&self, tenant: NewTenant, admin_role_id: Uuid) -> StoreResult<Tenant> {
        let mut t = self.tables.write().await;
        if t.tenants.iter().any(|x| x.name == tenant.name) {
            return Err(unique("tenants_name_key"));
        }
        if t.tenants.iter().any(|x| x.schema_name == tenant.schema_name) {
            return Err(unique("tenants_schema_name_key"));
        }
        if t.role(admin_role_id).is_none() {
            return Err(foreign_key("memberships_role_id_fkey"));
        }

        let now = OffsetDateTime::now_utc();
        let record = Tenant {
            id: Uuid::new_v4(),
            name: tenant.name,
            schema_name: tenant.schema_name,
            admin_id: tenant.admin_id,
            created_at: now,
        };
        let admin = t
            .users
            .iter_mut()
            .find(|u| u.id == tenant.admin_id)
            .ok_or_else(|| foreign_key("tenants_admin_id_fkey"))?;
        if admin.current_tenant_id.is_none() {
            admin.current_tenant_id = Some(record.id);
        }

        t.memberships.push(Membership {
            user_id: tenant.admin_id,
            tenant_id: record.id,
            role_id: admin_role_id,
            joined_at: now,
        });
        t.tenants.push(record.clone());
        Ok(record)
    }

    async fn get_tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>> {
        let t = self.tables.read().await;
        Ok(t.tenants.iter().find(|x| x.id == id).cloned())
    }

    async fn tenant_name_exists(&self, name: &str) -> StoreResult<bool> {
        let t = self.tables.read().await;
        Ok(t.tenants.iter().any(|x| x.name == name))
    }

    async fn schema_name_exists(&self, schema_name: &str) -> StoreResult<bool> {
        let t = self.tables.read().await;
        Ok(t.tenants.iter().any(|x| x.schema_name == schema_name))
    }

    async fn list_user_tenants(&self, user_id: Uuid) -> StoreResult<Vec<TenantMembership>> {
        let t = self.tables.read().await;
        let mut out: Vec<TenantMembership> = t
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| {
                let tenant = t.tenants.iter().find(|x| x.id == m.tenant_id)?;
                let role = t.role(m.role_id)?;
                Some(TenantMembership {
                    tenant_id: tenant.id,
                    name: tenant.name.clone(),
                    schema_name: tenant.schema_name.clone(),
                    role: role.name.clone(),
                    joined_at: m.joined_at,
                })
            })
            .collect();
        out.sort_by_key(|m| m.joined_at);
        Ok(out)
    }

    async fn list_tenant_members(&self, tenant_id: Uuid) -> StoreResult<Vec<TenantMember>> {
        let t = self.tables.read().await;
        let mut out: Vec<TenantMember> = t
            .memberships
            .iter()
            .filter(|m| m.tenant_id == tenant_id)
            .filter_map(|m| t.member(m))
            .collect();
        out.sort_by_key(|m| m.joined_at);
        Ok(out)
    }

    async fn membership_role(&self, user_id: Uuid, tenant_id: Uuid) -> StoreResult<Option<Role>> {
        let t = self.tables.read().await;
        Ok(t.memberships
            .iter()
            .find(|m| m.user_id == user_id && m.tenant_id == tenant_id)
            .and_then(|m| t.role(m.role_id))
            .cloned())
    }

    async fn upsert_membership(&self, user_id: Uuid, tenant_id: Uuid, role_id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if t.role(role_id).is_none() {
            return Err(foreign_key("memberships_role_id_fkey"));
        }
        if let Some(existing) = t
            .memberships
            .iter_mut()
            .find(|m| m.user_id == user_id && m.tenant_id == tenant_id)
        {
            existing.role_id = role_id;
        } else {
            t.memberships.push(Membership {
                user_id,
                tenant_id,
                role_id,
                joined_at: OffsetDateTime::now_utc(),
            });
        }
        Ok(())
    }

    async fn change_member_role(&self, tenant_id: Uuid, user_id: Uuid, role: &Role) -> StoreResult<RoleChange> {
        let mut t = self.tables.write().await;
        if t.role(role.id).is_none() {
            return Err(foreign_key("memberships_role_id_fkey"));
        }
        let Some(index) = t
            .memberships
            .iter()
            .position(|m| m.user_id == user_id && m.tenant_id == tenant_id)
        else {
            return Ok(RoleChange::NotMember);
        };
        if t.is_admin(&t.memberships[index]) && role.name != ADMIN_ROLE {
            let admins = t
                .memberships
                .iter()
                .filter(|m| m.tenant_id == tenant_id && t.is_admin(m))
                .count();
            if admins <= 1 {
                return Ok(RoleChange::LastAdmin);
            }
        }
        t.memberships[index].role_id = role.id;
        let membership = t.memberships[index].clone();
        Ok(t.member(&membership).map_or(RoleChange::NotMember, RoleChange::Changed))
    }

    async fn create_role(&self, role: NewRole) -> StoreResult<Role> {
        let mut t = self.tables.write().await;
        if t.roles.iter().any(|r| r.name == role.name) {
            return Err(unique("roles_name_key"));
        }
        let record = Role {
            id: Uuid::new_v4(),
            name: role.name,
            description: role.description,
            created_at: OffsetDateTime::now_utc(),
        };
        t.roles.push(record.clone());
        Ok(record)
    }

    async fn list_roles(&self, skip: i64, limit: i64) -> StoreResult<Vec<Role>> {
        let t = self.tables.read().await;
        let mut roles = t.roles.clone();
        roles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));
        Ok(roles
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get_role(&self, id: Uuid) -> StoreResult<Option<Role>> {
        let t = self.tables.read().await;
        Ok(t.role(id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let t = self.tables.read().await;
        Ok(t.roles.iter().find(|r| r.name == name).cloned())
    }

    async fn update_role(&self, id: Uuid, role: NewRole) -> StoreResult<Option<Role>> {
        let mut t = self.tables.write().await;
        if t.roles.iter().any(|r| r.name == role.name && r.id != id) {
            return Err(unique("roles_name_key"));
        }
        Ok(t.roles.iter_mut().find(|r| r.id == id).map(|existing| {
            existing.name = role.name;
            existing.description = role.description;
            existing.clone()
        }))
    }

    async fn delete_role(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if t.memberships.iter().any(|m| m.role_id == id) {
            return Err(foreign_key("memberships_role_id_fkey"));
        }
        let before = t.roles.len();
        t.roles.retain(|r| r.id != id);
        Ok(t.roles.len() != before)
    }

    async fn role_in_use(&self, id: Uuid) -> StoreResult<bool> {
        let t = self.tables.read().await;
        Ok(t.memberships.iter().any(|m| m.role_id == id))
    }

    async fn create_invite(&self, invite: NewInvite) -> StoreResult<Invite> {
        let mut t = self.tables.write().await;
        if t.invites.iter().any(|i| i.token == invite.token) {
            return Err(unique("invites_token_key"));
        }
        let record = Invite {
            id: Uuid::new_v4(),
            email: invite.email,
            tenant_id: invite.tenant_id,
            invited_by: invite.invited_by,
            token: invite.token,
            status: InviteStatus::Pending,
            expires_at: invite.expires_at,
            accepted_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        t.invites.push(record.clone());
        Ok(record)
    }

    async fn find_pending_invite(&self, email: &str, tenant_id: Uuid) -> StoreResult<Option<Invite>> {
        let t = self.tables.read().await;
        Ok(t.invites
            .iter()
            .find(|i| i.email == email && i.tenant_id == tenant_id && i.status == InviteStatus::Pending)
            .cloned())
    }

    async fn find_invite_by_token(&self, token: &str) -> StoreResult<Option<Invite>> {
        let t = self.tables.read().await;
        Ok(t.invites.iter().find(|i| i.token == token).cloned())
    }

    async fn set_invite_status(
        &self,
        id: Uuid,
        status: InviteStatus,
        accepted_at: Option<OffsetDateTime>,
    ) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if let Some(invite) = t.invites.iter_mut().find(|i| i.id == id) {
            invite.status = status;
            invite.accepted_at = accepted_at;
        }
        Ok(())
    }

    async fn delete_invite(&self, id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        t.invites.retain(|i| i.id != id);
        Ok(())
    }

    async fn insert_refresh_token(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        let mut t = self.tables.write().await;
        if t.refresh_tokens.iter().any(|r| r.token == token.token) {
            return Err(unique("refresh_tokens_token_key"));
        }
        let record = RefreshToken {
            id: Uuid::new_v4(),
            user_id: token.user_id,
            token: token.token,
            revoked: false,
            expires_at: token.expires_at,
            created_at: OffsetDateTime::now_utc(),
            replaced_by_token: None,
        };
        t.refresh_tokens.push(record.clone());
        Ok(record)
    }

    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        let t = self.tables.read().await;
        Ok(t.refresh_tokens.iter().find(|r| r.token == token).cloned())
    }

    async fn revoke_refresh_token(&self, token: &str, replaced_by: Option<&str>) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let Some(record) = t.refresh_tokens.iter_mut().find(|r| r.token == token && !r.revoked) else {
            return Ok(false);
        };
        record.revoked = true;
        if let Some(next) = replaced_by {
            record.replaced_by_token = Some(next.to_string());
        }
        Ok(true)
    }

    async fn revoke_user_refresh_tokens(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut t = self.tables.write().await;
        let mut revoked = 0;
        for record in t.refresh_tokens.iter_mut().filter(|r| r.user_id == user_id && !r.revoked) {
            record.revoked = true;
            revoked += 1;
        }
        Ok(revoked)
    }

    async fn insert_reset_token(&self, token: NewPasswordResetToken) -> StoreResult<PasswordResetToken> {
        let mut t = self.tables.write().await;
        if t.reset_tokens.iter().any(|r| r.token == token.token) {
            return Err(unique("password_reset_tokens_token_key"));
        }
        let record = PasswordResetToken {
            id: Uuid::new_v4(),
            user_id: token.user_id,
            token: token.token,
            expires_at: token.expires_at,
            used: false,
            created_at: OffsetDateTime::now_utc(),
        };
        t.reset_tokens.push(record.clone());
        Ok(record)
    }

    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>> {
        let t = self.tables.read().await;
        Ok(t.reset_tokens.iter().find(|r| r.token == token).cloned())
    }

    async fn mark_reset_token_used(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        match t.reset_tokens.iter_mut().find(|r| r.id == id && !r.used) {
            Some(record) => {
                record.used = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_agent(&self, tenant_id: Uuid, agent: NewAgent) -> StoreResult<Agent> {
        let mut t = self.tables.write().await;
        if !t.tenants.iter().any(|x| x.id == tenant_id) {
            return Err(foreign_key("agents_tenant_id_fkey"));
        }
        let record = Agent {
            id: Uuid::new_v4(),
            tenant_id,
            name: agent.name,
            system_prompt: agent.system_prompt,
            language: agent.language,
            voice_type: agent.voice_type,
            fallback_response: agent.fallback_response,
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
        };
        t.agents.push(record.clone());
        Ok(record)
    }

    async fn get_agent(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<Option<Agent>> {
        let t = self.tables.read().await;
        Ok(t.agents
            .iter()
            .find(|a| a.id == id && a.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_agents(
        &self,
        tenant_id: Uuid,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<Agent>, i64)> {
        let t = self.tables.read().await;
        let matching: Vec<&Agent> = t
            .agents
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .filter(|a| search.map_or(true, |s| a.name.to_lowercase().contains(s)))
            .collect();
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn update_agent(&self, id: Uuid, tenant_id: Uuid, changes: AgentChanges) -> StoreResult<Option<Agent>> {
        let mut t = self.tables.write().await;
        Ok(t.agents
            .iter_mut()
            .find(|a| a.id == id && a.tenant_id == tenant_id)
            .map(|agent| {
                changes.apply(agent, OffsetDateTime::now_utc());
                agent.clone()
            }))
    }

    async fn delete_agent(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let Some(index) = t
            .agents
            .iter()
            .position(|a| a.id == id && a.tenant_id == tenant_id)
        else {
            return Ok(false);
        };
        if t.call_sessions.iter().any(|c| c.agent_id == id) {
            return Err(foreign_key("call_sessions_agent_id_fkey"));
        }
        t.agents.remove(index);
        Ok(true)
    }

    async fn create_call_session(&self, session: NewCallSession) -> StoreResult<CallSession> {
        let mut t = self.tables.write().await;
        if !t
            .agents
            .iter()
            .any(|a| a.id == session.agent_id && a.tenant_id == session.tenant_id)
        {
            return Err(foreign_key("call_sessions_agent_id_fkey"));
        }
        if let Some(sid) = &session.twilio_call_sid {
            if t.call_sessions
                .iter()
                .any(|c| c.twilio_call_sid.as_deref() == Some(sid.as_str()))
            {
                return Err(unique("call_sessions_twilio_call_sid_key"));
            }
        }
        let now = OffsetDateTime::now_utc();
        let record = CallSession {
            id: Uuid::new_v4(),
            user_id: session.user_id,
            agent_id: session.agent_id,
            tenant_id: session.tenant_id,
            start_time: now,
            end_time: None,
            status: CallStatus::Active,
            duration: None,
            call_transcript: Vec::new(),
            response_times: Vec::new(),
            twilio_call_sid: session.twilio_call_sid,
            from_number: session.from_number,
            to_number: session.to_number,
            created_at: now,
            updated_at: None,
        };
        t.call_sessions.push(record.clone());
        Ok(record)
    }

    async fn get_call_session(&self, id: Uuid) -> StoreResult<Option<CallSession>> {
        let t = self.tables.read().await;
        Ok(t.call_sessions.iter().find(|c| c.id == id).cloned())
    }

    async fn find_call_session_by_sid(&self, call_sid: &str) -> StoreResult<Option<CallSession>> {
        let t = self.tables.read().await;
        Ok(t.call_sessions
            .iter()
            .find(|c| c.twilio_call_sid.as_deref() == Some(call_sid))
            .cloned())
    }

    async fn list_call_sessions(&self, filter: &CallSessionFilter) -> StoreResult<(Vec<CallSession>, i64)> {
        let t = self.tables.read().await;
        let mut matching: Vec<&CallSession> = t
            .call_sessions
            .iter()
            .filter(|c| c.tenant_id == filter.tenant_id && c.user_id == filter.user_id)
            .filter(|c| filter.agent_id.map_or(true, |id| c.agent_id == id))
            .filter(|c| filter.status.map_or(true, |s| c.status == s))
            .collect();
        // Newest first; later inserts win ties.
        matching.reverse();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn append_utterance(&self, id: Uuid, utterance: &Utterance) -> StoreResult<Option<CallSession>> {
        let mut t = self.tables.write().await;
        Ok(t.call_sessions.iter_mut().find(|c| c.id == id).map(|existing| {
            existing.record_utterance(utterance.clone());
            existing.clone()
        }))
    }

    async fn save_call_status(&self, session: &CallSession) -> StoreResult<Option<CallSession>> {
        let mut t = self.tables.write().await;
        Ok(t.call_sessions.iter_mut().find(|c| c.id == session.id).map(|existing| {
            existing.status = session.status;
            existing.end_time = session.end_time;
            existing.duration = session.duration;
            existing.updated_at = session.updated_at;
            existing.clone()
        }))
    }
}
