//! `/api/v1/invites` handlers.

use axum::extract::State;

use super::AppState;
use crate::api::extract::{Json, TenantAdmin};
use crate::error::Result;
use crate::schemas::{
    AcceptInviteRequest, AcceptInviteResponse, ErrorResponse, InviteCreate, InviteCreated,
    SuccessResponse, UserOut,
};

#[utoipa::path(
    post,
    path = "/api/v1/invites",
    tag = "invites",
    security(("bearer" = [])),
    request_body = InviteCreate,
    responses(
        (status = 201, description = "Invitation sent", body = SuccessResponse<InviteCreated>),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 409, description = "Already a member or already invited", body = ErrorResponse),
        (status = 500, description = "Invitation mail could not be sent", body = ErrorResponse)
    )
)]
pub async fn create_invite(
    State(state): State<AppState>,
    TenantAdmin(ctx): TenantAdmin,
    Json(request): Json<InviteCreate>,
) -> Result<SuccessResponse<InviteCreated>> {
    let invite = state
        .services
        .invites
        .create(ctx.tenant_id, ctx.user.id, request)
        .await?;
    Ok(SuccessResponse::created(
        InviteCreated {
            invite_id: invite.id,
            email: invite.email,
            expires_at: invite.expires_at,
        },
        "Invitation sent successfully",
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/invites/accept",
    tag = "invites",
    request_body = AcceptInviteRequest,
    responses(
        (status = 201, description = "Invitation accepted", body = SuccessResponse<AcceptInviteResponse>),
        (status = 400, description = "Invitation expired", body = ErrorResponse),
        (status = 404, description = "Unknown or used invitation", body = ErrorResponse),
        (status = 409, description = "Already a member", body = ErrorResponse)
    )
)]
pub async fn accept_invite(
    State(state): State<AppState>,
    Json(request): Json<AcceptInviteRequest>,
) -> Result<SuccessResponse<AcceptInviteResponse>> {
    let (user, tokens) = state.services.invites.accept(request).await?;
    Ok(SuccessResponse::created(
        AcceptInviteResponse {
            user: UserOut::from(user),
            tokens,
        },
        "Invitation accepted successfully",
    ))
}
