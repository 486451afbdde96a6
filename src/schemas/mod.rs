//! Request and response payloads of the HTTP API.
//!
//! Requests carry a `validate()` that normalises and checks their fields
//! before a service sees them.

pub mod agent;
pub mod auth;
pub mod call_session;
pub mod common;
pub mod invite;
pub mod role;
pub mod tenant;
pub mod validation;

pub use agent::{AgentCreate, AgentListQuery, AgentListResponse, AgentPage, AgentUpdate};
pub use auth::{
    ForgotPasswordRequest, LoginRequest, LogoutRequest, RefreshRequest, RegisterRequest,
    ResetPasswordRequest, SwitchTenantRequest, TokenResponse, UserOut,
};
pub use call_session::{
    CallSessionCreate, CallSessionFilter, CallSessionList, CallSessionListQuery, CallStatusUpdate,
    TranscriptAppend,
};
pub use common::{ErrorResponse, HealthStatus, MessageResponse, SuccessResponse};
pub use invite::{AcceptInviteRequest, AcceptInviteResponse, InviteCreate, InviteCreated};
pub use role::{RoleInput, RoleListQuery};
pub use tenant::{MemberRoleUpdate, TenantCreate, TenantCreateResponse};
