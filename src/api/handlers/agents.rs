//! `/api/v1/agents` handlers, scoped to the caller's active tenant.

use axum::extract::State;
use uuid::Uuid;

use super::AppState;
use crate::api::extract::{Json, Path, Query, TenantContext};
use crate::error::Result;
use crate::models::Agent;
use crate::schemas::{
    AgentCreate, AgentListQuery, AgentListResponse, AgentUpdate, ErrorResponse, MessageResponse,
    SuccessResponse,
};

#[utoipa::path(
    post,
    path = "/api/v1/agents",
    tag = "agents",
    security(("bearer" = [])),
    request_body = AgentCreate,
    responses(
        (status = 201, description = "Agent created", body = SuccessResponse<Agent>),
        (status = 400, description = "No active tenant", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse)
    )
)]
pub async fn create_agent(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(request): Json<AgentCreate>,
) -> Result<SuccessResponse<Agent>> {
    let agent = state.services.agents.create(ctx.tenant_id, request).await?;
    Ok(SuccessResponse::created(agent, "Agent created successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/agents",
    tag = "agents",
    security(("bearer" = [])),
    params(AgentListQuery),
    responses((status = 200, description = "Page of agents", body = SuccessResponse<AgentListResponse>))
)]
pub async fn list_agents(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<AgentListQuery>,
) -> Result<SuccessResponse<AgentListResponse>> {
    let page = state.services.agents.list(ctx.tenant_id, query).await?;
    Ok(SuccessResponse::ok(page, "Agents retrieved successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/agents/search/{term}",
    tag = "agents",
    security(("bearer" = [])),
    params(("term" = String, Path, description = "Case-insensitive name fragment")),
    responses((status = 200, description = "Matching agents", body = SuccessResponse<Vec<Agent>>))
)]
pub async fn search_agents(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(term): Path<String>,
) -> Result<SuccessResponse<Vec<Agent>>> {
    let agents = state.services.agents.search(ctx.tenant_id, &term).await?;
    Ok(SuccessResponse::ok(agents, "Agents retrieved successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/agents/{agent_id}",
    tag = "agents",
    security(("bearer" = [])),
    params(("agent_id" = Uuid, Path, description = "Agent ID")),
    responses(
        (status = 200, description = "Agent", body = SuccessResponse<Agent>),
        (status = 404, description = "Agent not found", body = ErrorResponse)
    )
)]
pub async fn get_agent(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(agent_id): Path<Uuid>,
) -> Result<SuccessResponse<Agent>> {
    let agent = state.services.agents.get(ctx.tenant_id, agent_id).await?;
    Ok(SuccessResponse::ok(agent, "Agent retrieved successfully"))
}

#[utoipa::path(
    put,
    path = "/api/v1/agents/{agent_id}",
    tag = "agents",
    security(("bearer" = [])),
    params(("agent_id" = Uuid, Path, description = "Agent ID")),
    request_body = AgentUpdate,
    responses(
        (status = 200, description = "Agent updated", body = SuccessResponse<Agent>),
        (status = 404, description = "Agent not found", body = ErrorResponse)
    )
)]
pub async fn update_agent(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(agent_id): Path<Uuid>,
    Json(request): Json<AgentUpdate>,
) -> Result<SuccessResponse<Agent>> {
    let agent = state
        .services
        .agents
        .update(ctx.tenant_id, agent_id, request)
        .await?;
    Ok(SuccessResponse::ok(agent, "Agent updated successfully"))
}

#[utoipa::path(
    delete,
    path = "/api/v1/agents/{agent_id}",
    tag = "agents",
    security(("bearer" = [])),
    params(("agent_id" = Uuid, Path, description = "Agent ID")),
    responses(
        (status = 200, description = "Agent deleted", body = SuccessResponse<MessageResponse>),
        (status = 404, description = "Agent not found", body = ErrorResponse),
        (status = 409, description = "Agent still has call sessions", body = ErrorResponse)
    )
)]
pub async fn delete_agent(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(agent_id): Path<Uuid>,
) -> Result<SuccessResponse<MessageResponse>> {
    state.services.agents.delete(ctx.tenant_id, agent_id).await?;
    Ok(SuccessResponse::ok(
        MessageResponse::new("Agent deleted"),
        "Agent deleted successfully",
    ))
}
