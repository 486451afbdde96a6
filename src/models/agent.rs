//! Voice agents configured by a tenant.

use serde::Serialize;
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// A voice agent owned by a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
pub struct Agent {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// Instructions given to the language model.
    pub system_prompt: Option<String>,
    pub language: Option<String>,
    pub voice_type: Option<String>,
    /// Spoken when the agent cannot answer.
    pub fallback_response: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Values for an agent about to be created.
#[derive(Debug, Clone, Default)]
pub struct NewAgent {
    pub name: String,
    pub system_prompt: Option<String>,
    pub language: Option<String>,
    pub voice_type: Option<String>,
    pub fallback_response: Option<String>,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct AgentChanges {
    pub name: Option<String>,
    pub system_prompt: Option<String>,
    pub language: Option<String>,
    pub voice_type: Option<String>,
    pub fallback_response: Option<String>,
}

impl AgentChanges {
    /// Whether no field would change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.system_prompt.is_none()
            && self.language.is_none()
            && self.voice_type.is_none()
            && self.fallback_response.is_none()
    }

    /// Apply the changes to `agent`, stamping `updated_at`.
    pub fn apply(self, agent: &mut Agent, now: OffsetDateTime) {
        if let Some(name) = self.name {
            agent.name = name;
        }
        if let Some(v) = self.system_prompt {
            agent.system_prompt = Some(v);
        }
        if let Some(v) = self.language {
            agent.language = Some(v);
        }
        if let Some(v) = self.voice_type {
            agent.voice_type = Some(v);
        }
        if let Some(v) = self.fallback_response {
            agent.fallback_response = Some(v);
        }
        agent.updated_at = Some(now);
    }
}
