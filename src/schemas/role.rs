//! Role payloads.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::validation::{optional_text, required_text};
use crate::error::AppError;
use crate::models::NewRole;

/// Body of role create and replace.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RoleInput {
    pub name: String,
    pub description: Option<String>,
}

impl RoleInput {
    pub fn validate(self) -> Result<NewRole, AppError> {
        Ok(NewRole {
            name: required_text("name", &self.name, 100)?.to_lowercase(),
            description: optional_text("description", self.description, 500)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RoleListQuery {
    /// Number of roles to skip.
    #[serde(default)]
    pub skip: Option<i64>,
    /// Maximum number of roles to return (1..=1000, default 100).
    #[serde(default)]
    pub limit: Option<i64>,
}

impl RoleListQuery {
    pub fn bounds(&self) -> Result<(i64, i64), AppError> {
        let skip = self.skip.unwrap_or(0);
        let limit = self.limit.unwrap_or(100);
        if skip < 0 {
            return Err(AppError::Validation("skip must be >= 0".to_string()));
        }
        if !(1..=1000).contains(&limit) {
            return Err(AppError::Validation("limit must be between 1 and 1000".to_string()));
        }
        Ok((skip, limit))
    }
}
