//! Role catalogue management.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::Role;
use crate::schemas::{RoleInput, RoleListQuery};
use crate::store::Store;

/// Role service.
#[derive(Clone)]
pub struct RoleService {
    store: Arc<dyn Store>,
}

impl RoleService {
    /// Create a new role service.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: RoleInput) -> Result<Role> {
        let role = input.validate()?;
        if self.store.find_role_by_name(&role.name).await?.is_some() {
            return Err(AppError::Conflict(format!("Role '{}' already exists", role.name)));
        }
        let role = self.store.create_role(role).await?;
        info!(role_id = %role.id, "Role created");
        Ok(role)
    }

    pub async fn list(&self, query: RoleListQuery) -> Result<Vec<Role>> {
        let (skip, limit) = query.bounds()?;
        Ok(self.store.list_roles(skip, limit).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Role> {
        self.store
            .get_role(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Role not found".to_string()))
    }

    /// Rename or redescribe a custom role.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: Uuid, input: RoleInput) -> Result<Role> {
        let existing = self.get(id).await?;
        if existing.is_builtin() {
            return Err(AppError::Conflict(format!(
                "Built-in role '{}' cannot be modified",
                existing.name
            )));
        }

        let changes = input.validate()?;
        if let Some(other) = self.store.find_role_by_name(&changes.name).await? {
            if other.id != id {
                return Err(AppError::Conflict(format!("Role '{}' already exists", changes.name)));
            }
        }

        self.store
            .update_role(id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Role not found".to_string()))
    }

    /// Delete a custom role nobody holds.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let existing = self.get(id).await?;
        if existing.is_builtin() {
            return Err(AppError::Conflict(format!(
                "Built-in role '{}' cannot be deleted",
                existing.name
            )));
        }
        if self.store.role_in_use(id).await? {
            return Err(AppError::Conflict(
                "Role is assigned to tenant members and cannot be deleted".to_string(),
            ));
        }
        if !self.store.delete_role(id).await? {
            return Err(AppError::NotFound("Role not found".to_string()));
        }
        info!(role_id = %id, name = %existing.name, "Role deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ADMIN_ROLE, MEMBER_ROLE};
    use crate::store::MemoryStore;

    fn service() -> RoleService {
        RoleService::new(Arc::new(MemoryStore::new()))
    }

    fn input(name: &str) -> RoleInput {
        RoleInput {
            name: name.to_string(),
            description: Some("Can read reports".to_string()),
        }
    }

    #[tokio::test]
    async fn builtin_roles_are_seeded_and_protected() {
        let service = service();
        let roles = service.list(RoleListQuery::default()).await.unwrap();
        let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&ADMIN_ROLE));
        assert!(names.contains(&MEMBER_ROLE));

        let admin = roles.iter().find(|r| r.name == ADMIN_ROLE).unwrap();
        assert!(matches!(service.delete(admin.id).await, Err(AppError::Conflict(_))));
        assert!(matches!(
            service.update(admin.id, input("owner")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn custom_role_lifecycle() {
        let service = service();
        let role = service.create(input("Analyst")).await.unwrap();
        assert_eq!(role.name, "analyst");

        assert!(matches!(
            service.create(input("analyst")).await,
            Err(AppError::Conflict(_))
        ));

        let renamed = service.update(role.id, input("auditor")).await.unwrap();
        assert_eq!(renamed.name, "auditor");

        service.delete(role.id).await.unwrap();
        assert!(matches!(service.get(role.id).await, Err(AppError::NotFound(_))));
    }
}
