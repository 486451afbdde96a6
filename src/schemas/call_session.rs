//! Call session payloads.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::validation::{check_phone, optional_text};
use crate::error::AppError;
use crate::models::{CallSession, CallStatus, TranscriptRole};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CallSessionCreate {
    pub agent_id: Uuid,
    pub twilio_call_sid: Option<String>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
}

impl CallSessionCreate {
    pub fn validate(self) -> Result<Self, AppError> {
        Ok(Self {
            agent_id: self.agent_id,
            twilio_call_sid: optional_text("twilio_call_sid", self.twilio_call_sid, 255)?,
            from_number: check_phone("from_number", self.from_number)?,
            to_number: check_phone("to_number", self.to_number)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallSessionListQuery {
    /// Maximum sessions to return (1..=100, default 50).
    pub limit: Option<i64>,
    /// Sessions to skip.
    pub offset: Option<i64>,
    /// Only sessions handled by this agent.
    pub agent_id: Option<Uuid>,
    /// Only sessions in this status.
    pub status: Option<String>,
}

/// Validated listing filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSessionFilter {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub status: Option<CallStatus>,
    pub limit: i64,
    pub offset: i64,
}

impl CallSessionListQuery {
    pub fn validate(self, tenant_id: Uuid, user_id: Uuid) -> Result<CallSessionFilter, AppError> {
        let limit = self.limit.unwrap_or(50);
        let offset = self.offset.unwrap_or(0);
        if !(1..=100).contains(&limit) {
            return Err(AppError::Validation("limit must be between 1 and 100".to_string()));
        }
        if offset < 0 {
            return Err(AppError::Validation("offset must be >= 0".to_string()));
        }
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => Some(
                raw.to_lowercase()
                    .parse::<CallStatus>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid status filter: {raw}")))?,
            ),
            None => None,
        };
        Ok(CallSessionFilter {
            tenant_id,
            user_id,
            agent_id: self.agent_id,
            status,
            limit,
            offset,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CallSessionList {
    pub sessions: Vec<CallSession>,
    pub total: i64,
}

/// Append one utterance to a transcript.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TranscriptAppend {
    pub role: TranscriptRole,
    pub content: String,
    /// Agent reply latency in seconds.
    pub response_time: Option<f64>,
}

impl TranscriptAppend {
    pub fn validate(self) -> Result<Self, AppError> {
        if self.content.trim().is_empty() {
            return Err(AppError::Validation("content must not be empty".to_string()));
        }
        if let Some(rt) = self.response_time {
            if !rt.is_finite() || rt < 0.0 {
                return Err(AppError::Validation("response_time must be a non-negative number".to_string()));
            }
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CallStatusUpdate {
    pub status: CallStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_query_parses_status() {
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let filter = CallSessionListQuery {
            status: Some("Completed".into()),
            ..Default::default()
        }
        .validate(tenant, user)
        .unwrap();
        assert_eq!(filter.status, Some(CallStatus::Completed));
        assert_eq!(filter.limit, 50);
        assert_eq!(filter.offset, 0);
    }

    #[test]
    fn list_query_rejects_unknown_status() {
        let result = CallSessionListQuery {
            status: Some("ringing".into()),
            ..Default::default()
        }
        .validate(Uuid::new_v4(), Uuid::new_v4());
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn create_checks_phone_numbers() {
        let result = CallSessionCreate {
            agent_id: Uuid::new_v4(),
            twilio_call_sid: None,
            from_number: Some("5551234".into()),
            to_number: None,
        }
        .validate();
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn transcript_rejects_negative_latency() {
        let result = TranscriptAppend {
            role: TranscriptRole::Assistant,
            content: "hello".into(),
            response_time: Some(-1.0),
        }
        .validate();
        assert!(result.is_err());
    }
}
