//! HTTP API route definitions.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use super::docs;
use super::handlers::{
    agents, auth, calls, health, invites, metrics, ready, roles, root, tenants, voice, AppState,
};
use crate::config::Config;
use crate::metrics::record_http_request;

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Health endpoints
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        // Authentication
        .route("/api/v1/auth/register", post(auth::register))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/refresh", post(auth::refresh))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/api/v1/auth/me", get(auth::me))
        .route("/api/v1/auth/token-info", get(auth::token_info))
        .route("/api/v1/auth/switch-tenant", post(auth::switch_tenant))
        .route("/api/v1/auth/forgot-password", post(auth::forgot_password))
        .route("/api/v1/auth/reset-password", post(auth::reset_password))
        // Tenants
        .route(
            "/api/v1/tenants",
            post(tenants::create_tenant).get(tenants::list_tenants),
        )
        .route("/api/v1/tenants/:tenant_id", get(tenants::get_tenant))
        .route("/api/v1/tenants/current/members", get(tenants::list_members))
        .route(
            "/api/v1/tenants/current/members/:user_id/role",
            put(tenants::update_member_role),
        )
        // Roles
        .route(
            "/api/v1/roles",
            post(roles::create_role).get(roles::list_roles),
        )
        .route(
            "/api/v1/roles/:role_id",
            get(roles::get_role)
                .put(roles::update_role)
                .delete(roles::delete_role),
        )
        // Invitations
        .route("/api/v1/invites", post(invites::create_invite))
        .route("/api/v1/invites/accept", post(invites::accept_invite))
        // Agents
        .route(
            "/api/v1/agents",
            post(agents::create_agent).get(agents::list_agents),
        )
        .route("/api/v1/agents/search/:term", get(agents::search_agents))
        .route(
            "/api/v1/agents/:agent_id",
            get(agents::get_agent)
                .put(agents::update_agent)
                .delete(agents::delete_agent),
        )
        // Call sessions
        .route(
            "/api/v1/calls/sessions",
            post(calls::create_session).get(calls::list_sessions),
        )
        .route("/api/v1/calls/sessions/:session_id", get(calls::get_session))
        .route(
            "/api/v1/calls/sessions/:session_id/stats",
            get(calls::session_stats),
        )
        .route(
            "/api/v1/calls/sessions/:session_id/transcript",
            post(calls::append_transcript),
        )
        .route(
            "/api/v1/calls/sessions/:session_id/status",
            patch(calls::update_status),
        )
        // Telephony
        .route(
            "/api/v1/voice/webhook/call-events",
            post(voice::call_events),
        )
        .merge(docs::swagger_ui())
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Record latency and status of every routed request.
async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    record_http_request(start, &method, &endpoint, response.status().as_u16());
    response
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = match config.cors_origins() {
        Some(origins) => {
            let parsed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse() {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(origin = %origin, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(parsed)
        }
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
