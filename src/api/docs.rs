//! OpenAPI document and Swagger UI.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use super::handlers;
use crate::schemas::ErrorResponse;

/// Where the Swagger UI is served.
pub const DOCS_PATH: &str = "/api/v1/docs";
/// Where the raw OpenAPI document is served.
pub const OPENAPI_PATH: &str = "/api/v1/openapi.json";

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(title = "Voice Agent API", description = "Multi-tenant backend for voice agents"),
    paths(
        handlers::root,
        handlers::health,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::auth::me,
        handlers::auth::token_info,
        handlers::auth::switch_tenant,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::tenants::create_tenant,
        handlers::tenants::list_tenants,
        handlers::tenants::get_tenant,
        handlers::tenants::list_members,
        handlers::tenants::update_member_role,
        handlers::roles::create_role,
        handlers::roles::list_roles,
        handlers::roles::get_role,
        handlers::roles::update_role,
        handlers::roles::delete_role,
        handlers::invites::create_invite,
        handlers::invites::accept_invite,
        handlers::agents::create_agent,
        handlers::agents::list_agents,
        handlers::agents::search_agents,
        handlers::agents::get_agent,
        handlers::agents::update_agent,
        handlers::agents::delete_agent,
        handlers::calls::create_session,
        handlers::calls::list_sessions,
        handlers::calls::get_session,
        handlers::calls::session_stats,
        handlers::calls::append_transcript,
        handlers::calls::update_status,
        handlers::voice::call_events,
    ),
    components(schemas(ErrorResponse)),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Liveness"),
        (name = "auth", description = "Registration, login and tokens"),
        (name = "tenants", description = "Tenants and memberships"),
        (name = "roles", description = "Membership roles"),
        (name = "invites", description = "Tenant invitations"),
        (name = "agents", description = "Voice agents of the active tenant"),
        (name = "calls", description = "Call sessions of the caller"),
        (name = "voice", description = "Telephony provider callbacks"),
    )
)]
pub struct ApiDoc;

/// Swagger UI serving [`ApiDoc`].
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new(DOCS_PATH).url(OPENAPI_PATH, ApiDoc::openapi())
}
