//! Tenant invitations.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::auth::{hash_blocking, AuthService};
use super::mailer::{token_link, Mailer};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{Invite, InviteStatus, NewInvite, NewUser, User, MEMBER_ROLE};
use crate::schemas::validation::{check_password, optional_text};
use crate::schemas::{AcceptInviteRequest, InviteCreate, TokenResponse};
use crate::security::generate_token;
use crate::store::Store;

/// Invitation service.
#[derive(Clone)]
pub struct InviteService {
    store: Arc<dyn Store>,
    config: Arc<Config>,
    mailer: Arc<dyn Mailer>,
    auth: AuthService,
}

impl InviteService {
    /// Create a new invitation service.
    pub fn new(
        store: Arc<dyn Store>,
        config: Arc<Config>,
        mailer: Arc<dyn Mailer>,
        auth: AuthService,
    ) -> Self {
        Self {
            store,
            config,
            mailer,
            auth,
        }
    }

    /// Invite an email address into `tenant_id` and mail the link.
    ///
    /// The invite is removed again when the mail cannot be sent.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create(&self, tenant_id: Uuid, invited_by: Uuid, request: InviteCreate) -> Result<Invite> {
        let request = request.validate()?;

        if let Some(existing) = self.store.find_user_by_email(&request.email).await? {
            if self.store.membership_role(existing.id, tenant_id).await?.is_some() {
                return Err(AppError::Conflict(
                    "User is already a member of this tenant".to_string(),
                ));
            }
        }
        if self
            .store
            .find_pending_invite(&request.email, tenant_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "An invitation is already pending for this email".to_string(),
            ));
        }

        let tenant = self
            .store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;

        let invite = self
            .store
            .create_invite(NewInvite {
                email: request.email,
                tenant_id,
                invited_by,
                token: generate_token(),
                expires_at: OffsetDateTime::now_utc() + self.config.invite_ttl(),
            })
            .await?;

        let link = token_link(&self.config.frontend_url, "accept-invite", &invite.token);
        if let Err(e) = self.mailer.send_invite(&invite.email, &tenant.name, &link).await {
            error!(invite_id = %invite.id, error = %e, "Invitation mail failed, removing invite");
            self.store.delete_invite(invite.id).await?;
            return Err(e.into());
        }

        metrics::inc_invites_sent();
        info!(invite_id = %invite.id, %tenant_id, "Invitation sent");
        Ok(invite)
    }

    /// Redeem an invitation, creating the account when needed.
    #[instrument(skip_all)]
    pub async fn accept(&self, request: AcceptInviteRequest) -> Result<(User, TokenResponse)> {
        let now = OffsetDateTime::now_utc();
        let invite = self
            .store
            .find_invite_by_token(request.token.trim())
            .await?
            .filter(|i| i.status == InviteStatus::Pending)
            .ok_or_else(|| AppError::NotFound("Invalid or already used invitation".to_string()))?;

        if invite.is_expired(now) {
            self.store
                .set_invite_status(invite.id, InviteStatus::Expired, None)
                .await?;
            return Err(AppError::BadRequest("Invitation has expired".to_string()));
        }

        let member_role = self
            .store
            .find_role_by_name(MEMBER_ROLE)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role '{MEMBER_ROLE}' not found")))?;

        let user = match self.store.find_user_by_email(&invite.email).await? {
            Some(user) => {
                if self.store.membership_role(user.id, invite.tenant_id).await?.is_some() {
                    return Err(AppError::Conflict(
                        "User is already a member of this tenant".to_string(),
                    ));
                }
                if user.current_tenant_id.is_none() {
                    self.store
                        .set_current_tenant(user.id, Some(invite.tenant_id))
                        .await?;
                }
                user
            }
            None => self.create_invited_user(&invite, request).await?,
        };

        self.store
            .upsert_membership(user.id, invite.tenant_id, member_role.id)
            .await?;
        self.store
            .set_invite_status(invite.id, InviteStatus::Accepted, Some(now))
            .await?;

        metrics::inc_invites_accepted();
        info!(invite_id = %invite.id, user_id = %user.id, "Invitation accepted");

        let user = self.store.get_user(user.id).await?.unwrap_or(user);
        let tokens = self.auth.issue_tokens(&user, Some(invite.tenant_id)).await?;
        Ok((user, tokens))
    }

    async fn create_invited_user(&self, invite: &Invite, request: AcceptInviteRequest) -> Result<User> {
        let password = request.password.ok_or_else(|| {
            AppError::Validation("password is required to create a new account".to_string())
        })?;
        check_password(&password)?;

        let local_part = invite.email.split('@').next().unwrap_or("User").to_string();
        let first_name = optional_text("first_name", request.first_name, 100)?.unwrap_or(local_part);
        let last_name =
            optional_text("last_name", request.last_name, 100)?.unwrap_or_else(|| "User".to_string());

        let hashed_password = hash_blocking(password).await?;
        let user = self
            .store
            .create_user(NewUser {
                first_name,
                last_name,
                email: invite.email.clone(),
                phone: None,
                hashed_password,
                current_tenant_id: Some(invite.tenant_id),
            })
            .await?;
        metrics::inc_users_registered();
        Ok(user)
    }
}
