//! Registration, login and token lifecycle.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::mailer::{token_link, Mailer};
use crate::config::Config;
use crate::error::{AppError, AuthError, Result};
use crate::metrics;
use crate::models::{NewPasswordResetToken, NewRefreshToken, NewUser, User};
use crate::schemas::validation::check_password;
use crate::schemas::{LoginRequest, RegisterRequest, ResetPasswordRequest, TokenResponse};
use crate::security::{generate_token, hash_password, verify_password, AccessClaims, JwtKeys};
use crate::store::Store;

/// Reply to every forgot-password request, whether or not the user exists.
pub const FORGOT_PASSWORD_MESSAGE: &str =
    "If the email exists, a password reset link has been sent";

/// Hash `password` on the blocking pool.
pub(crate) async fn hash_blocking(password: String) -> Result<String> {
    let _timer = metrics::timer_password_hash();
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(AppError::from)
}

async fn verify_blocking(password: String, hashed: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hashed))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(AppError::from)
}

/// Authentication service.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    config: Arc<Config>,
    keys: JwtKeys,
    mailer: Arc<dyn Mailer>,
}

impl AuthService {
    /// Create a new auth service.
    pub fn new(store: Arc<dyn Store>, config: Arc<Config>, keys: JwtKeys, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            config,
            keys,
            mailer,
        }
    }

    /// Access token keys.
    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// Create an account and sign it in.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<(User, TokenResponse)> {
        let request = request.validate()?;
        if self.store.find_user_by_email(&request.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let hashed_password = hash_blocking(request.password).await?;
        let user = self
            .store
            .create_user(NewUser {
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                phone: request.phone,
                hashed_password,
                current_tenant_id: None,
            })
            .await?;

        metrics::inc_users_registered();
        info!(user_id = %user.id, "User registered");

        let tokens = self.issue_tokens(&user, None).await?;
        Ok((user, tokens))
    }

    /// Exchange credentials for a token pair.
    #[instrument(skip(self, request))]
    pub async fn login(&self, request: LoginRequest) -> Result<TokenResponse> {
        let email = request.email.trim().to_lowercase();
        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                metrics::inc_logins(false);
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !verify_blocking(request.password, user.hashed_password.clone()).await? {
            metrics::inc_logins(false);
            warn!(user_id = %user.id, "Login with wrong password");
            return Err(AuthError::InvalidCredentials.into());
        }

        metrics::inc_logins(true);
        let tenant_id = self.resolve_active_tenant(&user).await?;
        self.issue_tokens(&user, tenant_id).await
    }

    /// Rotate a refresh token.
    ///
    /// A revoked token presented again revokes every token of its owner.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse> {
        let now = OffsetDateTime::now_utc();
        let stored = self
            .store
            .find_refresh_token(refresh_token)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        if stored.revoked {
            return Err(self.reject_reuse(stored.user_id).await);
        }
        if !stored.is_usable(now) {
            return Err(AuthError::InvalidRefreshToken.into());
        }

        // Only one caller can flip the token to revoked; a loser is a replay.
        let next = generate_token();
        if !self.store.revoke_refresh_token(&stored.token, Some(&next)).await? {
            return Err(self.reject_reuse(stored.user_id).await);
        }

        let user = self
            .store
            .get_user(stored.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        let tenant_id = self.resolve_active_tenant(&user).await?;

        let tokens = self.issue_tokens_with(&user, tenant_id, next).await?;
        metrics::inc_token_refreshes();
        Ok(tokens)
    }

    /// Revoke every token of `user_id` after a replayed refresh token.
    async fn reject_reuse(&self, user_id: Uuid) -> AppError {
        match self.store.revoke_user_refresh_tokens(user_id).await {
            Ok(revoked) => {
                metrics::inc_refresh_reuse();
                warn!(%user_id, revoked, "Revoked refresh token reused");
                AuthError::InvalidRefreshToken.into()
            }
            Err(e) => e.into(),
        }
    }

    /// Revoke a refresh token. Unknown tokens are ignored.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        self.store.revoke_refresh_token(refresh_token, None).await?;
        Ok(())
    }

    /// Verify an access token and load its subject.
    pub async fn authenticate(&self, token: &str) -> Result<(AccessClaims, User)> {
        let claims = self.keys.verify(token)?;
        let user = self
            .store
            .get_user(claims.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        Ok((claims, user))
    }

    /// Make `tenant_id` the user's active tenant and issue tokens scoped to it.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn switch_tenant(&self, user: &User, tenant_id: Uuid) -> Result<TokenResponse> {
        if self.store.membership_role(user.id, tenant_id).await?.is_none() {
            return Err(AuthError::NotTenantMember.into());
        }
        self.store.set_current_tenant(user.id, Some(tenant_id)).await?;
        info!(%tenant_id, "Active tenant switched");
        self.issue_tokens(user, Some(tenant_id)).await
    }

    /// Store and mail a reset token when the address belongs to a user.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            return Ok(());
        };

        let token = generate_token();
        self.store
            .insert_reset_token(NewPasswordResetToken {
                user_id: user.id,
                token: token.clone(),
                expires_at: OffsetDateTime::now_utc() + self.config.password_reset_ttl(),
            })
            .await?;

        let link = token_link(&self.config.frontend_url, "reset-password", &token);
        if let Err(e) = self.mailer.send_password_reset(&user.email, &link).await {
            warn!(user_id = %user.id, error = %e, "Password reset mail failed");
        }
        Ok(())
    }

    /// Replace the password behind a reset token and sign out everywhere.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<()> {
        check_password(&request.new_password)?;
        let stored = self
            .store
            .find_reset_token(&request.token)
            .await?
            .filter(|t| t.is_usable(OffsetDateTime::now_utc()))
            .ok_or(AuthError::InvalidResetToken)?;

        let hashed = hash_blocking(request.new_password).await?;
        if !self.store.mark_reset_token_used(stored.id).await? {
            return Err(AuthError::InvalidResetToken.into());
        }
        self.store.update_password(stored.user_id, &hashed).await?;
        let revoked = self.store.revoke_user_refresh_tokens(stored.user_id).await?;
        info!(user_id = %stored.user_id, revoked, "Password reset");
        Ok(())
    }

    /// Issue an access token scoped to `tenant_id` and a fresh refresh token.
    pub async fn issue_tokens(&self, user: &User, tenant_id: Option<Uuid>) -> Result<TokenResponse> {
        self.issue_tokens_with(user, tenant_id, generate_token()).await
    }

    async fn issue_tokens_with(
        &self,
        user: &User,
        tenant_id: Option<Uuid>,
        refresh_token: String,
    ) -> Result<TokenResponse> {
        let memberships = self.store.list_user_tenants(user.id).await?;
        let role = tenant_id.and_then(|id| {
            memberships
                .iter()
                .find(|m| m.tenant_id == id)
                .map(|m| m.role.clone())
        });

        let now = OffsetDateTime::now_utc();
        let access_token = self.keys.issue(user.id, &user.email, tenant_id, role, now)?;
        self.store
            .insert_refresh_token(NewRefreshToken {
                user_id: user.id,
                token: refresh_token.clone(),
                expires_at: now + self.config.refresh_token_ttl(),
            })
            .await?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.keys.ttl().whole_seconds(),
            user_id: user.id,
            email: user.email.clone(),
            tenant_id,
            tenant_ids: memberships.into_iter().map(|m| m.tenant_id).collect(),
        })
    }

    /// Current tenant if still a member, else the first membership.
    async fn resolve_active_tenant(&self, user: &User) -> Result<Option<Uuid>> {
        let memberships = self.store.list_user_tenants(user.id).await?;
        if let Some(current) = user.current_tenant_id {
            if memberships.iter().any(|m| m.tenant_id == current) {
                return Ok(Some(current));
            }
        }

        let fallback = memberships.first().map(|m| m.tenant_id);
        if fallback != user.current_tenant_id {
            self.store.set_current_tenant(user.id, fallback).await?;
        }
        Ok(fallback)
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService").field("keys", &self.keys).finish_non_exhaustive()
    }
}
