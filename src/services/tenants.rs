//! Tenant provisioning and membership management.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AuthError, Result};
use crate::metrics;
use crate::models::{NewTenant, Tenant, TenantMember, TenantMembership, User, ADMIN_ROLE};
use crate::schemas::TenantCreate;
use crate::store::{RoleChange, Store};

/// Longest slug kept before the `_schema` suffix.
pub const MAX_SCHEMA_SLUG_LEN: usize = 40;

static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("schema slug pattern is valid"));

/// Derive the base schema name for a tenant name.
///
/// `"Acme Corp!"` becomes `acme_corp_schema`; names without any usable
/// character fall back to `tenant_schema`.
pub fn schema_name_for(name: &str) -> String {
    let lowered = name.to_lowercase();
    let slug = NON_ALNUM.replace_all(&lowered, "_");
    let slug: String = slug.trim_matches('_').chars().take(MAX_SCHEMA_SLUG_LEN).collect();
    let slug = slug.trim_end_matches('_');
    let slug = if slug.is_empty() { "tenant" } else { slug };
    format!("{slug}_schema")
}

/// Tenant service.
#[derive(Clone)]
pub struct TenantService {
    store: Arc<dyn Store>,
}

impl TenantService {
    /// Create a new tenant service.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a tenant administered by `owner`.
    #[instrument(skip(self, owner, request), fields(owner = %owner.id, name = %request.name))]
    pub async fn create(&self, owner: &User, request: TenantCreate) -> Result<Tenant> {
        let request = request.validate()?;
        if self.store.tenant_name_exists(&request.name).await? {
            return Err(AppError::Conflict("Tenant name already exists".to_string()));
        }

        let schema_name = self.unique_schema_name(&request.name).await?;
        let admin = self
            .store
            .find_role_by_name(ADMIN_ROLE)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role '{ADMIN_ROLE}' not found")))?;

        let tenant = self
            .store
            .create_tenant(
                NewTenant {
                    name: request.name,
                    schema_name,
                    admin_id: owner.id,
                },
                admin.id,
            )
            .await?;

        metrics::inc_tenants_created();
        info!(tenant_id = %tenant.id, schema = %tenant.schema_name, "Tenant created");
        Ok(tenant)
    }

    /// Tenants `user_id` belongs to, with the role held in each.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<TenantMembership>> {
        Ok(self.store.list_user_tenants(user_id).await?)
    }

    /// Fetch a tenant the caller is a member of.
    pub async fn get(&self, user_id: Uuid, tenant_id: Uuid) -> Result<Tenant> {
        let tenant = self
            .store
            .get_tenant(tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tenant not found".to_string()))?;
        if self.store.membership_role(user_id, tenant_id).await?.is_none() {
            return Err(AuthError::NotTenantMember.into());
        }
        Ok(tenant)
    }

    /// Members of a tenant with their roles.
    pub async fn members(&self, tenant_id: Uuid) -> Result<Vec<TenantMember>> {
        Ok(self.store.list_tenant_members(tenant_id).await?)
    }

    /// Assign `role_name` to a member. The last admin cannot be demoted.
    #[instrument(skip(self))]
    pub async fn set_member_role(
        &self,
        tenant_id: Uuid,
        member_id: Uuid,
        role_name: &str,
    ) -> Result<TenantMember> {
        let role_name = role_name.trim().to_lowercase();
        let role = self
            .store
            .find_role_by_name(&role_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role '{role_name}' not found")))?;

        match self.store.change_member_role(tenant_id, member_id, &role).await? {
            RoleChange::Changed(member) => {
                info!(%member_id, role = %role.name, "Member role changed");
                Ok(member)
            }
            RoleChange::NotMember => Err(AppError::NotFound(
                "User is not a member of this tenant".to_string(),
            )),
            RoleChange::LastAdmin => Err(AppError::Conflict(
                "Cannot demote the last admin of a tenant".to_string(),
            )),
        }
    }

    async fn unique_schema_name(&self, name: &str) -> Result<String> {
        let base = schema_name_for(name);
        if !self.store.schema_name_exists(&base).await? {
            return Ok(base);
        }
        let mut suffix = 1u32;
        loop {
            let candidate = format!("{base}_{suffix}");
            if !self.store.schema_name_exists(&candidate).await? {
                return Ok(candidate);
            }
            suffix += 1;
        }
    }
}
