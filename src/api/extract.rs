//! Request extractors for authenticated and tenant-scoped handlers.

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::handlers::AppState;
use crate::error::{AppError, AuthError};
use crate::models::{Role, User, ADMIN_ROLE};
use crate::security::AccessClaims;

/// JSON body whose rejections use the API error envelope.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Query string with enveloped rejections.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

/// Path parameters with enveloped rejections.
#[derive(Debug, Clone, Copy, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

/// Pull the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(parts: &Parts) -> Result<&str, AuthError> {
    let value = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken("authorization header is not ASCII".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AuthError::InvalidToken("expected a bearer token".to_string())),
    }
}

/// Authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub claims: AccessClaims,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let (claims, user) = state.services.auth.authenticate(token).await?;
        Ok(Self { user, claims })
    }
}

/// Authenticated caller acting inside the tenant selected by their token.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub user: User,
    pub claims: AccessClaims,
    pub tenant_id: Uuid,
    /// Role held in the tenant right now, not the one baked into the token.
    pub role: Role,
}

impl TenantContext {
    pub fn is_admin(&self) -> bool {
        self.role.name == ADMIN_ROLE
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for TenantContext {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser { user, claims } = CurrentUser::from_request_parts(parts, state).await?;
        let tenant_id = claims.tenant_id.ok_or(AuthError::NoActiveTenant)?;

        let role = state
            .store
            .membership_role(user.id, tenant_id)
            .await?
            .ok_or_else(|| {
                debug!(user_id = %user.id, %tenant_id, "Tenant access denied: not a member");
                AuthError::NotTenantMember
            })?;

        Ok(Self {
            user,
            claims,
            tenant_id,
            role,
        })
    }
}

/// [`TenantContext`] whose caller holds the admin role.
#[derive(Debug, Clone)]
pub struct TenantAdmin(pub TenantContext);

#[axum::async_trait]
impl FromRequestParts<AppState> for TenantAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ctx = TenantContext::from_request_parts(parts, state).await?;
        if !ctx.is_admin() {
            debug!(user_id = %ctx.user.id, role = %ctx.role.name, "Admin access denied");
            return Err(AuthError::AdminRequired.into());
        }
        Ok(Self(ctx))
    }
}
