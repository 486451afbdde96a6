//! `/api/v1/roles` handlers. Every route needs the admin role in the active tenant.

use axum::extract::State;
use uuid::Uuid;

use super::AppState;
use crate::api::extract::{Json, Path, Query, TenantAdmin};
use crate::error::Result;
use crate::models::Role;
use crate::schemas::{ErrorResponse, MessageResponse, RoleInput, RoleListQuery, SuccessResponse};

#[utoipa::path(
    post,
    path = "/api/v1/roles",
    tag = "roles",
    security(("bearer" = [])),
    request_body = RoleInput,
    responses(
        (status = 201, description = "Role created", body = SuccessResponse<Role>),
        (status = 409, description = "Role name taken", body = ErrorResponse)
    )
)]
pub async fn create_role(
    State(state): State<AppState>,
    _admin: TenantAdmin,
    Json(input): Json<RoleInput>,
) -> Result<SuccessResponse<Role>> {
    let role = state.services.roles.create(input).await?;
    Ok(SuccessResponse::created(role, "Role created successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles",
    tag = "roles",
    security(("bearer" = [])),
    params(RoleListQuery),
    responses((status = 200, description = "Roles", body = SuccessResponse<Vec<Role>>))
)]
pub async fn list_roles(
    State(state): State<AppState>,
    _admin: TenantAdmin,
    Query(query): Query<RoleListQuery>,
) -> Result<SuccessResponse<Vec<Role>>> {
    let roles = state.services.roles.list(query).await?;
    Ok(SuccessResponse::ok(roles, "Roles retrieved successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/roles/{role_id}",
    tag = "roles",
    security(("bearer" = [])),
    params(("role_id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role", body = SuccessResponse<Role>),
        (status = 404, description = "Role not found", body = ErrorResponse)
    )
)]
pub async fn get_role(
    State(state): State<AppState>,
    _admin: TenantAdmin,
    Path(role_id): Path<Uuid>,
) -> Result<SuccessResponse<Role>> {
    let role = state.services.roles.get(role_id).await?;
    Ok(SuccessResponse::ok(role, "Role retrieved successfully"))
}

#[utoipa::path(
    put,
    path = "/api/v1/roles/{role_id}",
    tag = "roles",
    security(("bearer" = [])),
    params(("role_id" = Uuid, Path, description = "Role ID")),
    request_body = RoleInput,
    responses(
        (status = 200, description = "Role updated", body = SuccessResponse<Role>),
        (status = 409, description = "Built-in role or name taken", body = ErrorResponse)
    )
)]
pub async fn update_role(
    State(state): State<AppState>,
    _admin: TenantAdmin,
    Path(role_id): Path<Uuid>,
    Json(input): Json<RoleInput>,
) -> Result<SuccessResponse<Role>> {
    let role = state.services.roles.update(role_id, input).await?;
    Ok(SuccessResponse::ok(role, "Role updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/roles/{role_id}",
    tag = "roles",
    security(("bearer" = [])),
    params(("role_id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted", body = SuccessResponse<MessageResponse>),
        (status = 409, description = "Built-in or assigned role", body = ErrorResponse)
    )
)]
pub async fn delete_role(
    State(state): State<AppState>,
    _admin: TenantAdmin,
    Path(role_id): Path<Uuid>,
) -> Result<SuccessResponse<MessageResponse>> {
    state.services.roles.delete(role_id).await?;
    Ok(SuccessResponse::ok(
        MessageResponse::new("Role deleted"),
        "Role deleted successfully",
    ))
}
