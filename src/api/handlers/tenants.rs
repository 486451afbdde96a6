//! `/api/v1/tenants` handlers.

use axum::extract::State;
use uuid::Uuid;

use super::AppState;
use crate::api::extract::{CurrentUser, Json, Path, TenantAdmin, TenantContext};
use crate::error::Result;
use crate::models::{Tenant, TenantMember, TenantMembership};
use crate::schemas::{ErrorResponse, MemberRoleUpdate, SuccessResponse, TenantCreate, TenantCreateResponse};

#[utoipa::path(
    post,
    path = "/api/v1/tenants",
    tag = "tenants",
    security(("bearer" = [])),
    request_body = TenantCreate,
    responses(
        (status = 201, description = "Tenant created", body = SuccessResponse<TenantCreateResponse>),
        (status = 409, description = "Tenant name already exists", body = ErrorResponse)
    )
)]
pub async fn create_tenant(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Json(request): Json<TenantCreate>,
) -> Result<SuccessResponse<TenantCreateResponse>> {
    let tenant = state.services.tenants.create(&user, request).await?;
    let message = format!("Tenant '{}' created successfully", tenant.name);
    Ok(SuccessResponse::created(
        TenantCreateResponse {
            tenant_id: tenant.id,
            message: message.clone(),
            tenant,
        },
        message,
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants",
    tag = "tenants",
    security(("bearer" = [])),
    responses((status = 200, description = "Tenants of the caller", body = SuccessResponse<Vec<TenantMembership>>))
)]
pub async fn list_tenants(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
) -> Result<SuccessResponse<Vec<TenantMembership>>> {
    let tenants = state.services.tenants.list_for_user(user.id).await?;
    Ok(SuccessResponse::ok(tenants, "Tenants retrieved successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant_id}",
    tag = "tenants",
    security(("bearer" = [])),
    params(("tenant_id" = Uuid, Path, description = "Tenant ID")),
    responses(
        (status = 200, description = "Tenant", body = SuccessResponse<Tenant>),
        (status = 403, description = "Not a member", body = ErrorResponse),
        (status = 404, description = "Tenant not found", body = ErrorResponse)
    )
)]
pub async fn get_tenant(
    State(state): State<AppState>,
    CurrentUser { user, .. }: CurrentUser,
    Path(tenant_id): Path<Uuid>,
) -> Result<SuccessResponse<Tenant>> {
    let tenant = state.services.tenants.get(user.id, tenant_id).await?;
    Ok(SuccessResponse::ok(tenant, "Tenant retrieved successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/tenants/current/members",
    tag = "tenants",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Members of the active tenant", body = SuccessResponse<Vec<TenantMember>>),
        (status = 400, description = "No active tenant", body = ErrorResponse)
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    ctx: TenantContext,
) -> Result<SuccessResponse<Vec<TenantMember>>> {
    let members = state.services.tenants.members(ctx.tenant_id).await?;
    Ok(SuccessResponse::ok(members, "Tenant members retrieved successfully"))
}

#[utoipa::path(
    put,
    path = "/api/v1/tenants/current/members/{user_id}/role",
    tag = "tenants",
    security(("bearer" = [])),
    params(("user_id" = Uuid, Path, description = "Member to update")),
    request_body = MemberRoleUpdate,
    responses(
        (status = 200, description = "Role changed", body = SuccessResponse<TenantMember>),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Member or role not found", body = ErrorResponse),
        (status = 409, description = "Would remove the last admin", body = ErrorResponse)
    )
)]
pub async fn update_member_role(
    State(state): State<AppState>,
    TenantAdmin(ctx): TenantAdmin,
    Path(user_id): Path<Uuid>,
    Json(request): Json<MemberRoleUpdate>,
) -> Result<SuccessResponse<TenantMember>> {
    let member = state
        .services
        .tenants
        .set_member_role(ctx.tenant_id, user_id, &request.role_name)
        .await?;
    Ok(SuccessResponse::ok(member, "Member role updated successfully"))
}
