//! Domain records persisted by the [`Store`](crate::store::Store).
//!
//! Every tenant-owned record carries its `tenant_id`; stores never return a
//! record across tenants unless the caller passes that tenant explicitly.

pub mod agent;
pub mod call_session;
pub mod invite;
pub mod role;
pub mod tenant;
pub mod token;
pub mod user;

pub use agent::{Agent, AgentChanges, NewAgent};
pub use call_session::{
    CallSession, CallSessionStats, CallStatus, NewCallSession, ResponseTimeEntry, TranscriptEntry,
    TranscriptRole, Utterance,
};
pub use invite::{Invite, InviteStatus, NewInvite};
pub use role::{NewRole, Role, ADMIN_ROLE, MEMBER_ROLE};
pub use tenant::{NewTenant, Tenant, TenantMember, TenantMembership};
pub use token::{NewPasswordResetToken, NewRefreshToken, PasswordResetToken, RefreshToken};
pub use user::{NewUser, User};
