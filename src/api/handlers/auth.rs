//! `/api/v1/auth` handlers.

use axum::extract::State;
use time::OffsetDateTime;

use super::AppState;
use crate::api::extract::{CurrentUser, Json};
use crate::error::Result;
use crate::schemas::{
    ErrorResponse, ForgotPasswordRequest, LoginRequest, LogoutRequest, MessageResponse,
    RefreshRequest, RegisterRequest, ResetPasswordRequest, SuccessResponse, SwitchTenantRequest,
    TokenResponse, UserOut,
};
use crate::security::TokenInfo;
use crate::services::auth::FORGOT_PASSWORD_MESSAGE;

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = SuccessResponse<TokenResponse>),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<SuccessResponse<TokenResponse>> {
    let (_, tokens) = state.services.auth.register(request).await?;
    Ok(SuccessResponse::created(tokens, "User registered successfully"))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SuccessResponse<TokenResponse>),
        (status = 401, description = "Incorrect email or password", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<SuccessResponse<TokenResponse>> {
    let tokens = state.services.auth.login(request).await?;
    Ok(SuccessResponse::ok(tokens, "Login successful"))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token pair rotated", body = SuccessResponse<TokenResponse>),
        (status = 401, description = "Invalid or expired refresh token", body = ErrorResponse)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<SuccessResponse<TokenResponse>> {
    let tokens = state.services.auth.refresh(&request.refresh_token).await?;
    Ok(SuccessResponse::ok(tokens, "Token refreshed successfully"))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    request_body = LogoutRequest,
    responses((status = 200, description = "Refresh token revoked", body = SuccessResponse<MessageResponse>))
)]
pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<LogoutRequest>,
) -> Result<SuccessResponse<MessageResponse>> {
    state.services.auth.logout(&request.refresh_token).await?;
    Ok(SuccessResponse::ok(
        MessageResponse::new("Logged out"),
        "Logout successful",
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Authenticated user", body = SuccessResponse<UserOut>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn me(CurrentUser { user, .. }: CurrentUser) -> SuccessResponse<UserOut> {
    SuccessResponse::ok(UserOut::from(user), "User retrieved successfully")
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/token-info",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Decoded access token", body = SuccessResponse<TokenInfo>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    )
)]
pub async fn token_info(CurrentUser { claims, .. }: CurrentUser) -> SuccessResponse<TokenInfo> {
    SuccessResponse::ok(
        claims.info(OffsetDateTime::now_utc()),
        "Token info retrieved successfully",
    )
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/switch-tenant",
    tag = "auth",
    security(("bearer" = [])),
    request_body = SwitchTenantRequest,
    responses(
        (status = 200, description = "Tokens scoped to the tenant", body = SuccessResponse<TokenResponse>),
        (status = 403, description = "Not a member of the tenant", body = ErrorResponse)
    )
)]
pub async fn switch_tenant(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Json(request): Json<SwitchTenantRequest>,
) -> Result<SuccessResponse<TokenResponse>> {
    let tokens = state.services.auth.switch_tenant(&user, request.tenant_id).await?;
    Ok(SuccessResponse::ok(tokens, "Tenant switched successfully"))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses((status = 200, description = "Reset link sent when the account exists", body = SuccessResponse<MessageResponse>))
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<SuccessResponse<MessageResponse>> {
    state.services.auth.forgot_password(&request.email).await?;
    Ok(SuccessResponse::ok(
        MessageResponse::new(FORGOT_PASSWORD_MESSAGE),
        FORGOT_PASSWORD_MESSAGE,
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = SuccessResponse<MessageResponse>),
        (status = 400, description = "Invalid or expired reset token", body = ErrorResponse)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<SuccessResponse<MessageResponse>> {
    state.services.auth.reset_password(request).await?;
    Ok(SuccessResponse::ok(
        MessageResponse::new("Password has been reset"),
        "Password reset successful",
    ))
}
