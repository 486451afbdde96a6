//! `/api/v1/calls/sessions` handlers.

use axum::extract::State;
use uuid::Uuid;

use super::AppState;
use crate::api::extract::{Json, Path, Query, TenantContext};
use crate::error::Result;
use crate::models::{CallSession, CallSessionStats};
use crate::schemas::{
    CallSessionCreate, CallSessionList, CallSessionListQuery, CallStatusUpdate, ErrorResponse,
    SuccessResponse, TranscriptAppend,
};

#[utoipa::path(
    post,
    path = "/api/v1/calls/sessions",
    tag = "calls",
    security(("bearer" = [])),
    request_body = CallSessionCreate,
    responses(
        (status = 201, description = "Session started", body = SuccessResponse<CallSession>),
        (status = 400, description = "Invalid phone number", body = ErrorResponse),
        (status = 404, description = "Agent not found", body = ErrorResponse)
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    ctx: TenantContext,
    Json(request): Json<CallSessionCreate>,
) -> Result<SuccessResponse<CallSession>> {
    let session = state
        .services
        .calls
        .create(ctx.tenant_id, ctx.user.id, request)
        .await?;
    Ok(SuccessResponse::created(session, "Call session created successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/calls/sessions",
    tag = "calls",
    security(("bearer" = [])),
    params(CallSessionListQuery),
    responses(
        (status = 200, description = "Caller's sessions, newest first", body = SuccessResponse<CallSessionList>),
        (status = 400, description = "Unknown status filter", body = ErrorResponse)
    )
)]
pub async fn list_sessions(
    State(state): State<AppState>,
    ctx: TenantContext,
    Query(query): Query<CallSessionListQuery>,
) -> Result<SuccessResponse<CallSessionList>> {
    let list = state
        .services
        .calls
        .list(ctx.tenant_id, ctx.user.id, query)
        .await?;
    Ok(SuccessResponse::ok(list, "Call sessions retrieved successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/calls/sessions/{session_id}",
    tag = "calls",
    security(("bearer" = [])),
    params(("session_id" = Uuid, Path, description = "Call session ID")),
    responses(
        (status = 200, description = "Call session", body = SuccessResponse<CallSession>),
        (status = 403, description = "Session belongs to someone else", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(session_id): Path<Uuid>,
) -> Result<SuccessResponse<CallSession>> {
    let session = state
        .services
        .calls
        .get(ctx.tenant_id, ctx.user.id, session_id)
        .await?;
    Ok(SuccessResponse::ok(session, "Call session retrieved successfully"))
}

#[utoipa::path(
    get,
    path = "/api/v1/calls/sessions/{session_id}/stats",
    tag = "calls",
    security(("bearer" = [])),
    params(("session_id" = Uuid, Path, description = "Call session ID")),
    responses((status = 200, description = "Transcript statistics", body = SuccessResponse<CallSessionStats>))
)]
pub async fn session_stats(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(session_id): Path<Uuid>,
) -> Result<SuccessResponse<CallSessionStats>> {
    let stats = state
        .services
        .calls
        .stats(ctx.tenant_id, ctx.user.id, session_id)
        .await?;
    Ok(SuccessResponse::ok(stats, "Call session stats retrieved successfully"))
}

#[utoipa::path(
    post,
    path = "/api/v1/calls/sessions/{session_id}/transcript",
    tag = "calls",
    security(("bearer" = [])),
    params(("session_id" = Uuid, Path, description = "Call session ID")),
    request_body = TranscriptAppend,
    responses((status = 200, description = "Transcript extended", body = SuccessResponse<CallSession>))
)]
pub async fn append_transcript(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(session_id): Path<Uuid>,
    Json(entry): Json<TranscriptAppend>,
) -> Result<SuccessResponse<CallSession>> {
    let session = state
        .services
        .calls
        .append_transcript(ctx.tenant_id, ctx.user.id, session_id, entry)
        .await?;
    Ok(SuccessResponse::ok(session, "Transcript updated successfully"))
}

#[utoipa::path(
    patch,
    path = "/api/v1/calls/sessions/{session_id}/status",
    tag = "calls",
    security(("bearer" = [])),
    params(("session_id" = Uuid, Path, description = "Call session ID")),
    request_body = CallStatusUpdate,
    responses((status = 200, description = "Status changed", body = SuccessResponse<CallSession>))
)]
pub async fn update_status(
    State(state): State<AppState>,
    ctx: TenantContext,
    Path(session_id): Path<Uuid>,
    Json(update): Json<CallStatusUpdate>,
) -> Result<SuccessResponse<CallSession>> {
    let session = state
        .services
        .calls
        .update_status(ctx.tenant_id, ctx.user.id, session_id, update.status)
        .await?;
    Ok(SuccessResponse::ok(session, "Call status updated successfully"))
}
