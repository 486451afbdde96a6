//! PostgreSQL [`Store`].

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use super::{RoleChange, Store};
use crate::config::Config;
use crate::error::{StoreError, StoreResult};
use crate::models::{
    Agent, AgentChanges, CallSession, Invite, InviteStatus, NewAgent, NewCallSession, NewInvite,
    NewPasswordResetToken, NewRefreshToken, NewRole, NewTenant, NewUser, PasswordResetToken,
    RefreshToken, Role, Tenant, TenantMember, TenantMembership, User, Utterance, ADMIN_ROLE,
};
use crate::schemas::CallSessionFilter;

const USER_COLUMNS: &str = "id, first_name, last_name, email, phone, hashed_password, \
     current_tenant_id, join_date, created_at";

const AGENT_COLUMNS: &str = "id, tenant_id, name, system_prompt, language, voice_type, \
     fallback_response, created_at, updated_at";

const MEMBER_SELECT: &str = "SELECT u.id AS user_id, u.email, u.first_name, u.last_name, \
     r.name AS role, m.joined_at \
     FROM memberships m \
     JOIN users u ON u.id = m.user_id \
     JOIN roles r ON r.id = m.role_id";

const CALL_COLUMNS: &str = "id, user_id, agent_id, tenant_id, start_time, end_time, status, \
     duration, call_transcript, response_times, twilio_call_sid, from_number, to_number, \
     created_at, updated_at";

/// Store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool sized from the configuration.
    pub async fn connect(config: &Config) -> StoreResult<Self> {
        info!(
            url = %config.database_url_redacted(),
            max_connections = config.database_max_connections,
            "Connecting to database"
        );
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Apply pending migrations from `migrations/`.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Quote an identifier for DDL. Schema names are generated from `[a-z0-9_]`
/// but the quoting holds for any input.
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (first_name, last_name, email, phone, hashed_password, current_tenant_id) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.hashed_password)
        .bind(user.current_tenant_id)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn set_current_tenant(&self, user_id: Uuid, tenant_id: Option<Uuid>) -> StoreResult<()> {
        sqlx::query("UPDATE users SET current_tenant_id = $2 WHERE id = $1")
            .bind(user_id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn update_password(&self, user_id: Uuid, hashed_password: &str) -> StoreResult<()> {
        sqlx::query("UPDATE users SET hashed_password = $2 WHERE id = $1")
            .bind(user_id)
            .bind(hashed_password)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn create_tenant(&self, tenant: NewTenant, admin_role_id: Uuid) -> StoreResult<Tenant> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;

        let record = sqlx::query_as::<_, Tenant>(
            "INSERT INTO tenants (name, schema_name, admin_id) VALUES ($1, $2, $3) \
             RETURNING id, name, schema_name, admin_id, created_at",
        )
        .bind(&tenant.name)
        .bind(&tenant.schema_name)
        .bind(tenant.admin_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        let ddl = format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(&record.schema_name));
        sqlx::query(&ddl)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;
        debug!(schema = %record.schema_name, "Tenant schema created");

        sqlx::query("INSERT INTO memberships (user_id, tenant_id, role_id) VALUES ($1, $2, $3)")
            .bind(tenant.admin_id)
            .bind(record.id)
            .bind(admin_role_id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;

        sqlx::query(
            "UPDATE users SET current_tenant_id = $2 WHERE id = $1 AND current_tenant_id IS NULL",
        )
        .bind(tenant.admin_id)
        .bind(record.id)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        tx.commit().await.map_err(StoreError::from_sqlx)?;
        Ok(record)
    }

    async fn get_tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>> {
        sqlx::query_as::<_, Tenant>(
            "SELECT id, name, schema_name, admin_id, created_at FROM tenants WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn tenant_name_exists(&self, name: &str) -> StoreResult<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM tenants WHERE name = $1)")
                .bind(name)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::from_sqlx)?;
        Ok(exists)
    }

    async fn schema_name_exists(&self, schema_name: &str) -> StoreResult<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM tenants WHERE schema_name = $1)")
                .bind(schema_name)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::from_sqlx)?;
        Ok(exists)
    }

    async fn list_user_tenants(&self, user_id: Uuid) -> StoreResult<Vec<TenantMembership>> {
        sqlx::query_as::<_, TenantMembership>(
            "SELECT t.id AS tenant_id, t.name, t.schema_name, r.name AS role, m.joined_at \
             FROM memberships m \
             JOIN tenants t ON t.id = m.tenant_id \
             JOIN roles r ON r.id = m.role_id \
             WHERE m.user_id = $1 \
             ORDER BY m.joined_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn list_tenant_members(&self, tenant_id: Uuid) -> StoreResult<Vec<TenantMember>> {
        sqlx::query_as::<_, TenantMember>(&format!(
            "{MEMBER_SELECT} WHERE m.tenant_id = $1 ORDER BY m.joined_at"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn membership_role(&self, user_id: Uuid, tenant_id: Uuid) -> StoreResult<Option<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT r.id, r.name, r.description, r.created_at \
             FROM memberships m JOIN roles r ON r.id = m.role_id \
             WHERE m.user_id = $1 AND m.tenant_id = $2",
        )
        .bind(user_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn upsert_membership(&self, user_id: Uuid, tenant_id: Uuid, role_id: Uuid) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO memberships (user_id, tenant_id, role_id) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id, tenant_id) DO UPDATE SET role_id = EXCLUDED.role_id",
        )
        .bind(user_id)
        .bind(tenant_id)
        .bind(role_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn change_member_role(&self, tenant_id: Uuid, user_id: Uuid, role: &Role) -> StoreResult<RoleChange> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;

        // Row locks serialize concurrent role changes within the tenant.
        let current: Vec<(Uuid, String)> = sqlx::query_as(
            "SELECT m.user_id, r.name FROM memberships m JOIN roles r ON r.id = m.role_id \
             WHERE m.tenant_id = $1 FOR UPDATE OF m",
        )
        .bind(tenant_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        let Some((_, current_role)) = current.iter().find(|(id, _)| *id == user_id) else {
            return Ok(RoleChange::NotMember);
        };
        let admins = current.iter().filter(|(_, name)| name == ADMIN_ROLE).count();
        if current_role == ADMIN_ROLE && role.name != ADMIN_ROLE && admins <= 1 {
            return Ok(RoleChange::LastAdmin);
        }

        sqlx::query("UPDATE memberships SET role_id = $3 WHERE user_id = $1 AND tenant_id = $2")
            .bind(user_id)
            .bind(tenant_id)
            .bind(role.id)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::from_sqlx)?;

        let member = sqlx::query_as::<_, TenantMember>(&format!(
            "{MEMBER_SELECT} WHERE m.tenant_id = $1 AND m.user_id = $2"
        ))
        .bind(tenant_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        tx.commit().await.map_err(StoreError::from_sqlx)?;
        Ok(RoleChange::Changed(member))
    }

    async fn create_role(&self, role: NewRole) -> StoreResult<Role> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (name, description) VALUES ($1, $2) \
             RETURNING id, name, description, created_at",
        )
        .bind(&role.name)
        .bind(&role.description)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn list_roles(&self, skip: i64, limit: i64) -> StoreResult<Vec<Role>> {
        sqlx::query_as::<_, Role>(
            "SELECT id, name, description, created_at FROM roles \
             ORDER BY created_at, name OFFSET $1 LIMIT $2",
        )
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get_role(&self, id: Uuid) -> StoreResult<Option<Role>> {
        sqlx::query_as::<_, Role>("SELECT id, name, description, created_at FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        sqlx::query_as::<_, Role>("SELECT id, name, description, created_at FROM roles WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn update_role(&self, id: Uuid, role: NewRole) -> StoreResult<Option<Role>> {
        sqlx::query_as::<_, Role>(
            "UPDATE roles SET name = $2, description = $3 WHERE id = $1 \
             RETURNING id, name, description, created_at",
        )
        .bind(id)
        .bind(&role.name)
        .bind(&role.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn delete_role(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn role_in_use(&self, id: Uuid) -> StoreResult<bool> {
        let (in_use,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM memberships WHERE role_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::from_sqlx)?;
        Ok(in_use)
    }

    async fn create_invite(&self, invite: NewInvite) -> StoreResult<Invite> {
        sqlx::query_as::<_, Invite>(
            "INSERT INTO invites (email, tenant_id, invited_by, token, status, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, email, tenant_id, invited_by, token, status, expires_at, accepted_at, created_at",
        )
        .bind(&invite.email)
        .bind(invite.tenant_id)
        .bind(invite.invited_by)
        .bind(&invite.token)
        .bind(InviteStatus::Pending.as_ref())
        .bind(invite.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find_pending_invite(&self, email: &str, tenant_id: Uuid) -> StoreResult<Option<Invite>> {
        sqlx::query_as::<_, Invite>(
            "SELECT id, email, tenant_id, invited_by, token, status, expires_at, accepted_at, created_at \
             FROM invites WHERE email = $1 AND tenant_id = $2 AND status = $3",
        )
        .bind(email)
        .bind(tenant_id)
        .bind(InviteStatus::Pending.as_ref())
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find_invite_by_token(&self, token: &str) -> StoreResult<Option<Invite>> {
        sqlx::query_as::<_, Invite>(
            "SELECT id, email, tenant_id, invited_by, token, status, expires_at, accepted_at, created_at \
             FROM invites WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn set_invite_status(
        &self,
        id: Uuid,
        status: InviteStatus,
        accepted_at: Option<OffsetDateTime>,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE invites SET status = $2, accepted_at = $3 WHERE id = $1")
            .bind(id)
            .bind(status.as_ref())
            .bind(accepted_at)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn delete_invite(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM invites WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn insert_refresh_token(&self, token: NewRefreshToken) -> StoreResult<RefreshToken> {
        sqlx::query_as::<_, RefreshToken>(
            "INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES ($1, $2, $3) \
             RETURNING id, user_id, token, revoked, expires_at, created_at, replaced_by_token",
        )
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find_refresh_token(&self, token: &str) -> StoreResult<Option<RefreshToken>> {
        sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, revoked, expires_at, created_at, replaced_by_token \
             FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn revoke_refresh_token(&self, token: &str, replaced_by: Option<&str>) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE, \
             replaced_by_token = COALESCE($2, replaced_by_token) \
             WHERE token = $1 AND revoked = FALSE",
        )
        .bind(token)
        .bind(replaced_by)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_user_refresh_tokens(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected())
    }

    async fn insert_reset_token(&self, token: NewPasswordResetToken) -> StoreResult<PasswordResetToken> {
        sqlx::query_as::<_, PasswordResetToken>(
            "INSERT INTO password_reset_tokens (user_id, token, expires_at) VALUES ($1, $2, $3) \
             RETURNING id, user_id, token, expires_at, used, created_at",
        )
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>> {
        sqlx::query_as::<_, PasswordResetToken>(
            "SELECT id, user_id, token, expires_at, used, created_at \
             FROM password_reset_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn mark_reset_token_used(&self, id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE id = $1 AND used = FALSE")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_agent(&self, tenant_id: Uuid, agent: NewAgent) -> StoreResult<Agent> {
        sqlx::query_as::<_, Agent>(&format!(
            "INSERT INTO agents (tenant_id, name, system_prompt, language, voice_type, fallback_response) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {AGENT_COLUMNS}"
        ))
        .bind(tenant_id)
        .bind(&agent.name)
        .bind(&agent.system_prompt)
        .bind(&agent.language)
        .bind(&agent.voice_type)
        .bind(&agent.fallback_response)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get_agent(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<Option<Agent>> {
        sqlx::query_as::<_, Agent>(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn list_agents(
        &self,
        tenant_id: Uuid,
        search: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<Agent>, i64)> {
        let pattern = search.map(|s| format!("%{}%", escape_like(s)));

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM agents \
             WHERE tenant_id = $1 AND ($2::TEXT IS NULL OR LOWER(name) LIKE $2)",
        )
        .bind(tenant_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        let agents = sqlx::query_as::<_, Agent>(&format!(
            "SELECT {AGENT_COLUMNS} FROM agents \
             WHERE tenant_id = $1 AND ($2::TEXT IS NULL OR LOWER(name) LIKE $2) \
             ORDER BY created_at, id OFFSET $3 LIMIT $4"
        ))
        .bind(tenant_id)
        .bind(&pattern)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok((agents, total))
    }

    async fn update_agent(&self, id: Uuid, tenant_id: Uuid, changes: AgentChanges) -> StoreResult<Option<Agent>> {
        sqlx::query_as::<_, Agent>(&format!(
            "UPDATE agents SET \
                name = COALESCE($3, name), \
                system_prompt = COALESCE($4, system_prompt), \
                language = COALESCE($5, language), \
                voice_type = COALESCE($6, voice_type), \
                fallback_response = COALESCE($7, fallback_response), \
                updated_at = NOW() \
             WHERE id = $1 AND tenant_id = $2 RETURNING {AGENT_COLUMNS}"
        ))
        .bind(id)
        .bind(tenant_id)
        .bind(&changes.name)
        .bind(&changes.system_prompt)
        .bind(&changes.language)
        .bind(&changes.voice_type)
        .bind(&changes.fallback_response)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn delete_agent(&self, id: Uuid, tenant_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM agents WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_call_session(&self, session: NewCallSession) -> StoreResult<CallSession> {
        sqlx::query_as::<_, CallSession>(&format!(
            "INSERT INTO call_sessions (user_id, agent_id, tenant_id, twilio_call_sid, from_number, to_number) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {CALL_COLUMNS}"
        ))
        .bind(session.user_id)
        .bind(session.agent_id)
        .bind(session.tenant_id)
        .bind(&session.twilio_call_sid)
        .bind(&session.from_number)
        .bind(&session.to_number)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get_call_session(&self, id: Uuid) -> StoreResult<Option<CallSession>> {
        sqlx::query_as::<_, CallSession>(&format!(
            "SELECT {CALL_COLUMNS} FROM call_sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find_call_session_by_sid(&self, call_sid: &str) -> StoreResult<Option<CallSession>> {
        sqlx::query_as::<_, CallSession>(&format!(
            "SELECT {CALL_COLUMNS} FROM call_sessions WHERE twilio_call_sid = $1"
        ))
        .bind(call_sid)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn list_call_sessions(&self, filter: &CallSessionFilter) -> StoreResult<(Vec<CallSession>, i64)> {
        let status = filter.status.map(|s| s.as_ref().to_string());
        const WHERE: &str = "tenant_id = $1 AND user_id = $2 \
             AND ($3::UUID IS NULL OR agent_id = $3) \
             AND ($4::TEXT IS NULL OR status = $4)";

        let (total,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM call_sessions WHERE {WHERE}"))
                .bind(filter.tenant_id)
                .bind(filter.user_id)
                .bind(filter.agent_id)
                .bind(&status)
                .fetch_one(&self.pool)
                .await
                .map_err(StoreError::from_sqlx)?;

        let sessions = sqlx::query_as::<_, CallSession>(&format!(
            "SELECT {CALL_COLUMNS} FROM call_sessions WHERE {WHERE} \
             ORDER BY created_at DESC OFFSET $5 LIMIT $6"
        ))
        .bind(filter.tenant_id)
        .bind(filter.user_id)
        .bind(filter.agent_id)
        .bind(&status)
        .bind(filter.offset)
        .bind(filter.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok((sessions, total))
    }

    async fn append_utterance(&self, id: Uuid, utterance: &Utterance) -> StoreResult<Option<CallSession>> {
        let latency: Vec<_> = utterance.response_time.iter().collect();
        sqlx::query_as::<_, CallSession>(&format!(
            "UPDATE call_sessions SET call_transcript = call_transcript || $2::jsonb, \
             response_times = response_times || $3::jsonb, updated_at = $4 \
             WHERE id = $1 RETURNING {CALL_COLUMNS}"
        ))
        .bind(id)
        .bind(Json(std::slice::from_ref(&utterance.entry)))
        .bind(Json(latency))
        .bind(utterance.entry.timestamp)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn save_call_status(&self, session: &CallSession) -> StoreResult<Option<CallSession>> {
        sqlx::query_as::<_, CallSession>(&format!(
            "UPDATE call_sessions SET status = $2, end_time = $3, duration = $4, updated_at = $5 \
             WHERE id = $1 RETURNING {CALL_COLUMNS}"
        ))
        .bind(session.id)
        .bind(session.status.as_ref())
        .bind(session.end_time)
        .bind(session.duration)
        .bind(session.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }
}

/// Escape `LIKE` metacharacters so search terms match literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
