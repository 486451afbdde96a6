//! Business rules behind the HTTP handlers.
//!
//! Each service owns a handle to the [`Store`] and validates its inputs
//! before touching it. Handlers never talk to the store directly.

pub mod agents;
pub mod auth;
pub mod call_sessions;
pub mod invites;
pub mod mailer;
pub mod roles;
pub mod tenants;

use std::sync::Arc;

use crate::config::Config;
use crate::security::JwtKeys;
use crate::store::Store;

pub use agents::AgentService;
pub use auth::AuthService;
pub use call_sessions::CallSessionService;
pub use invites::InviteService;
pub use mailer::{LogMailer, Mailer};
pub use roles::RoleService;
pub use tenants::TenantService;

/// Every service, wired to one store.
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub tenants: TenantService,
    pub roles: RoleService,
    pub invites: InviteService,
    pub agents: AgentService,
    pub calls: CallSessionService,
}

impl Services {
    /// Wire all services.
    pub fn new(config: Arc<Config>, store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        let auth = AuthService::new(
            store.clone(),
            config.clone(),
            JwtKeys::from_config(&config),
            mailer.clone(),
        );
        Self {
            tenants: TenantService::new(store.clone()),
            roles: RoleService::new(store.clone()),
            invites: InviteService::new(store.clone(), config, mailer, auth.clone()),
            agents: AgentService::new(store.clone()),
            calls: CallSessionService::new(store),
            auth,
        }
    }
}
