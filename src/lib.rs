//! Multi-tenant backend for voice agents.
//!
//! Users register, create tenants (workspaces), invite colleagues and
//! configure voice agents. Each conversation an agent has over the phone is
//! tracked as a call session whose status follows the telephony provider's
//! callbacks.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`models`]: Persisted entities
//! - [`schemas`]: Request and response payloads
//! - [`security`]: Passwords, JWTs, random tokens and webhook signatures
//! - [`store`]: Persistence trait with PostgreSQL and in-memory backends
//! - [`services`]: Business rules on top of the store
//! - [`voice`]: Telephony status mapping and TwiML replies
//! - [`api`]: HTTP router and handlers
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod schemas;
pub mod security;
pub mod services;
pub mod store;
pub mod utils;
pub mod voice;

pub use config::Config;
pub use error::{AppError, Result};
