//! Voice agent management, scoped to a tenant.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::Agent;
use crate::schemas::{AgentCreate, AgentListQuery, AgentListResponse, AgentUpdate};
use crate::store::Store;

/// Most results returned by a name search.
pub const SEARCH_LIMIT: i64 = 100;

/// Agent service.
#[derive(Clone)]
pub struct AgentService {
    store: Arc<dyn Store>,
}

impl AgentService {
    /// Create a new agent service.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(&self, tenant_id: Uuid, request: AgentCreate) -> Result<Agent> {
        let agent = self.store.create_agent(tenant_id, request.validate()?).await?;
        info!(agent_id = %agent.id, "Agent created");
        Ok(agent)
    }

    pub async fn get(&self, tenant_id: Uuid, id: Uuid) -> Result<Agent> {
        self.store
            .get_agent(id, tenant_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))
    }

    pub async fn list(&self, tenant_id: Uuid, query: AgentListQuery) -> Result<AgentListResponse> {
        let page = query.validate()?;
        let (agents, total) = self
            .store
            .list_agents(tenant_id, page.search.as_deref(), page.offset(), page.limit)
            .await?;
        Ok(AgentListResponse::new(agents, total, &page))
    }

    /// Agents whose name contains `term`, case-insensitively. Blank terms match nothing.
    pub async fn search(&self, tenant_id: Uuid, term: &str) -> Result<Vec<Agent>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let (agents, _) = self
            .store
            .list_agents(tenant_id, Some(&term), 0, SEARCH_LIMIT)
            .await?;
        Ok(agents)
    }

    #[instrument(skip(self, request))]
    pub async fn update(&self, tenant_id: Uuid, id: Uuid, request: AgentUpdate) -> Result<Agent> {
        let changes = request.validate()?;
        if changes.is_empty() {
            return self.get(tenant_id, id).await;
        }
        self.store
            .update_agent(id, tenant_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Agent not found".to_string()))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, tenant_id: Uuid, id: Uuid) -> Result<()> {
        if !self.store.delete_agent(id, tenant_id).await? {
            return Err(AppError::NotFound("Agent not found".to_string()));
        }
        info!(agent_id = %id, "Agent deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewTenant, NewUser, ADMIN_ROLE};
    use crate::store::MemoryStore;

    async fn tenant(store: &Arc<dyn Store>, name: &str) -> Uuid {
        let user = store
            .create_user(NewUser {
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                email: format!("{name}@example.com"),
                phone: None,
                hashed_password: "hash".to_string(),
                current_tenant_id: None,
            })
            .await
            .unwrap();
        let admin = store.find_role_by_name(ADMIN_ROLE).await.unwrap().unwrap();
        store
            .create_tenant(
                NewTenant {
                    name: name.to_string(),
                    schema_name: format!("{name}_schema"),
                    admin_id: user.id,
                },
                admin.id,
            )
            .await
            .unwrap()
            .id
    }

    fn create(name: &str) -> AgentCreate {
        AgentCreate {
            name: name.to_string(),
            system_prompt: None,
            language: Some("en".to_string()),
            voice_type: None,
            fallback_response: None,
        }
    }

    #[tokio::test]
    async fn pagination_and_search() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = AgentService::new(store.clone());
        let tenant_id = tenant(&store, "acme").await;

        for name in ["Sales One", "Sales Two", "Support"] {
            service.create(tenant_id, create(name)).await.unwrap();
        }

        let page = service
            .list(
                tenant_id,
                AgentListQuery {
                    page: Some(1),
                    limit: Some(2),
                    search: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert!(page.has_next);
        assert!(!page.has_prev);
        assert_eq!(page.data[0].name, "Sales One");

        let found = service.search(tenant_id, " SALES ").await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(service.search(tenant_id, "   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn other_tenants_cannot_see_agents() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = AgentService::new(store.clone());
        let acme = tenant(&store, "acme").await;
        let globex = tenant(&store, "globex").await;

        let agent = service.create(acme, create("Reception")).await.unwrap();
        assert!(matches!(service.get(globex, agent.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.delete(globex, agent.id).await, Err(AppError::NotFound(_))));
        assert!(service.get(acme, agent.id).await.is_ok());
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let service = AgentService::new(store.clone());
        let tenant_id = tenant(&store, "acme").await;
        let agent = service.create(tenant_id, create("Reception")).await.unwrap();

        let updated = service
            .update(
                tenant_id,
                agent.id,
                AgentUpdate {
                    name: Some("Front Desk".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Front Desk");
        assert_eq!(updated.language.as_deref(), Some("en"));
        assert!(updated.updated_at.is_some());
    }
}
