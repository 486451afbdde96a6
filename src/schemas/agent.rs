//! Agent payloads.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::validation::{optional_text, required_text};
use crate::error::AppError;
use crate::models::{Agent, AgentChanges, NewAgent};

const NAME_MAX: usize = 255;
const LANGUAGE_MAX: usize = 50;
const VOICE_TYPE_MAX: usize = 100;
const TEXT_MAX: usize = 20_000;

/// New agent. The tenant comes from the caller's active tenant.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AgentCreate {
    pub name: String,
    pub system_prompt: Option<String>,
    pub language: Option<String>,
    pub voice_type: Option<String>,
    pub fallback_response: Option<String>,
}

impl AgentCreate {
    pub fn validate(self) -> Result<NewAgent, AppError> {
        Ok(NewAgent {
            name: required_text("name", &self.name, NAME_MAX)?,
            system_prompt: optional_text("system_prompt", self.system_prompt, TEXT_MAX)?,
            language: optional_text("language", self.language, LANGUAGE_MAX)?,
            voice_type: optional_text("voice_type", self.voice_type, VOICE_TYPE_MAX)?,
            fallback_response: optional_text("fallback_response", self.fallback_response, TEXT_MAX)?,
        })
    }
}

/// Partial agent update; omitted fields stay as they are.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub system_prompt: Option<String>,
    pub language: Option<String>,
    pub voice_type: Option<String>,
    pub fallback_response: Option<String>,
}

impl AgentUpdate {
    pub fn validate(self) -> Result<AgentChanges, AppError> {
        let name = match self.name {
            Some(name) => Some(required_text("name", &name, NAME_MAX)?),
            None => None,
        };
        Ok(AgentChanges {
            name,
            system_prompt: optional_text("system_prompt", self.system_prompt, TEXT_MAX)?,
            language: optional_text("language", self.language, LANGUAGE_MAX)?,
            voice_type: optional_text("voice_type", self.voice_type, VOICE_TYPE_MAX)?,
            fallback_response: optional_text("fallback_response", self.fallback_response, TEXT_MAX)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AgentListQuery {
    /// Page number, starting at 1.
    pub page: Option<i64>,
    /// Records per page (1..=100, default 10).
    pub limit: Option<i64>,
    /// Case-insensitive name filter.
    pub search: Option<String>,
}

/// A validated page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentPage {
    pub page: i64,
    pub limit: i64,
    pub search: Option<String>,
}

impl AgentPage {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl AgentListQuery {
    pub fn validate(self) -> Result<AgentPage, AppError> {
        let page = self.page.unwrap_or(1);
        let limit = self.limit.unwrap_or(10);
        if page < 1 {
            return Err(AppError::Validation("page must be >= 1".to_string()));
        }
        if !(1..=100).contains(&limit) {
            return Err(AppError::Validation("limit must be between 1 and 100".to_string()));
        }
        if page.checked_mul(limit).is_none() {
            return Err(AppError::Validation("page is out of range".to_string()));
        }
        let search = self
            .search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        Ok(AgentPage { page, limit, search })
    }
}

/// One page of agents.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AgentListResponse {
    pub data: Vec<Agent>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl AgentListResponse {
    pub fn new(data: Vec<Agent>, total: i64, page: &AgentPage) -> Self {
        Self {
            data,
            total,
            page: page.page,
            limit: page.limit,
            total_pages: (total + page.limit - 1) / page.limit,
            has_next: page.page.saturating_mul(page.limit) < total,
            has_prev: page.page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_defaults() {
        let page = AgentListQuery::default().validate().unwrap();
        assert_eq!(page, AgentPage { page: 1, limit: 10, search: None });
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn list_query_bounds() {
        let too_big = AgentListQuery { limit: Some(101), ..Default::default() };
        assert!(too_big.validate().is_err());
        let zero_page = AgentListQuery { page: Some(0), ..Default::default() };
        assert!(zero_page.validate().is_err());
    }

    #[test]
    fn huge_page_is_rejected() {
        let query = AgentListQuery { page: Some(i64::MAX), ..Default::default() };
        assert!(matches!(query.validate(), Err(AppError::Validation(_))));
        let page = AgentPage { page: i64::MAX, limit: 100, search: None };
        assert_eq!(page.offset(), i64::MAX);
        let response = AgentListResponse::new(Vec::new(), 1, &page);
        assert!(!response.has_next);
    }

    #[test]
    fn blank_search_is_ignored() {
        let query = AgentListQuery { search: Some("   ".into()), ..Default::default() };
        assert_eq!(query.validate().unwrap().search, None);
        let query = AgentListQuery { search: Some(" Sales ".into()), ..Default::default() };
        assert_eq!(query.validate().unwrap().search.as_deref(), Some("sales"));
    }

    #[test]
    fn pagination_math() {
        let page = AgentPage { page: 2, limit: 10, search: None };
        let response = AgentListResponse::new(Vec::new(), 25, &page);
        assert_eq!(response.total_pages, 3);
        assert!(response.has_next);
        assert!(response.has_prev);

        let last = AgentPage { page: 3, limit: 10, search: None };
        let response = AgentListResponse::new(Vec::new(), 25, &last);
        assert!(!response.has_next);

        let empty = AgentListResponse::new(Vec::new(), 0, &AgentPage { page: 1, limit: 10, search: None });
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next);
        assert!(!empty.has_prev);
    }

    #[test]
    fn update_rejects_blank_name() {
        let update = AgentUpdate { name: Some("  ".into()), ..Default::default() };
        assert!(update.validate().is_err());
    }
}
