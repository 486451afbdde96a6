//! Call sessions between a caller and a voice agent.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Status of a call session.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CallStatus {
    /// Call is ringing or connected.
    Active,
    /// Call ended normally.
    Completed,
    /// Call could not be completed.
    Failed,
    /// Callee was busy.
    Busy,
}

impl CallStatus {
    /// Check if status is terminal (won't change).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallStatus::Active)
    }
}

impl TryFrom<String> for CallStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Speaker of a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TranscriptRole {
    User,
    Assistant,
    System,
}

/// One utterance of the call transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TranscriptEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub role: TranscriptRole,
    pub content: String,
}

/// Latency of one agent reply, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResponseTimeEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub response_time: f64,
}

/// A call handled by an agent on behalf of a user.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct CallSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub agent_id: Uuid,
    pub tenant_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    #[sqlx(try_from = "String")]
    pub status: CallStatus,
    /// Length of the call in whole seconds.
    pub duration: Option<i32>,
    #[sqlx(json)]
    pub call_transcript: Vec<TranscriptEntry>,
    #[sqlx(json)]
    pub response_times: Vec<ResponseTimeEntry>,
    pub twilio_call_sid: Option<String>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// Values for a call session about to be created.
#[derive(Debug, Clone)]
pub struct NewCallSession {
    pub user_id: Uuid,
    pub agent_id: Uuid,
    pub tenant_id: Uuid,
    pub twilio_call_sid: Option<String>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
}

/// Aggregates over a session's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CallSessionStats {
    pub session_id: Uuid,
    pub status: CallStatus,
    pub duration: Option<i32>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start_time: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub total_messages: usize,
    pub user_messages: usize,
    pub assistant_messages: usize,
    /// Mean agent latency in seconds.
    pub average_response_time: Option<f64>,
    pub total_response_time_entries: usize,
}

/// A transcript line plus, for agent replies, its latency.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub entry: TranscriptEntry,
    pub response_time: Option<ResponseTimeEntry>,
}

impl Utterance {
    pub fn new(role: TranscriptRole, content: String, response_time: Option<f64>, now: OffsetDateTime) -> Self {
        Self {
            entry: TranscriptEntry {
                timestamp: now,
                role,
                content,
            },
            response_time: response_time.map(|response_time| ResponseTimeEntry {
                timestamp: now,
                response_time,
            }),
        }
    }
}

impl CallSession {
    /// Move to `status` at `now`.
    ///
    /// Terminal statuses stamp `end_time` and derive `duration` from
    /// `start_time`, unless the provider reported a duration.
    pub fn transition(&mut self, status: CallStatus, now: OffsetDateTime, reported_duration: Option<i32>) {
        self.status = status;
        if status.is_terminal() {
            self.end_time = Some(now);
            let elapsed = (now - self.start_time).whole_seconds().max(0);
            self.duration = Some(reported_duration.unwrap_or(elapsed.min(i32::MAX as i64) as i32));
        }
        self.updated_at = Some(now);
    }

    /// Append a transcript line and, for agent replies, its latency.
    pub fn record_utterance(&mut self, utterance: Utterance) {
        self.updated_at = Some(utterance.entry.timestamp);
        self.call_transcript.push(utterance.entry);
        if let Some(latency) = utterance.response_time {
            self.response_times.push(latency);
        }
    }

    /// Compute transcript statistics.
    pub fn stats(&self) -> CallSessionStats {
        let count = |role: TranscriptRole| {
            self.call_transcript
                .iter()
                .filter(|entry| entry.role == role)
                .count()
        };

        let average_response_time = if self.response_times.is_empty() {
            None
        } else {
            let total: f64 = self.response_times.iter().map(|e| e.response_time).sum();
            Some(total / self.response_times.len() as f64)
        };

        CallSessionStats {
            session_id: self.id,
            status: self.status,
            duration: self.duration,
            start_time: Some(self.start_time),
            end_time: self.end_time,
            total_messages: self.call_transcript.len(),
            user_messages: count(TranscriptRole::User),
            assistant_messages: count(TranscriptRole::Assistant),
            average_response_time,
            total_response_time_entries: self.response_times.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn session(start: OffsetDateTime) -> CallSession {
        CallSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            agent_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            start_time: start,
            end_time: None,
            status: CallStatus::Active,
            duration: None,
            call_transcript: Vec::new(),
            response_times: Vec::new(),
            twilio_call_sid: None,
            from_number: None,
            to_number: None,
            created_at: start,
            updated_at: None,
        }
    }

    #[test]
    fn terminal_transition_sets_duration() {
        let start = OffsetDateTime::now_utc();
        let mut call = session(start);

        call.transition(CallStatus::Completed, start + Duration::seconds(95), None);

        assert_eq!(call.status, CallStatus::Completed);
        assert_eq!(call.end_time, Some(start + Duration::seconds(95)));
        assert_eq!(call.duration, Some(95));
    }

    #[test]
    fn reported_duration_wins() {
        let start = OffsetDateTime::now_utc();
        let mut call = session(start);
        call.transition(CallStatus::Busy, start + Duration::seconds(10), Some(3));
        assert_eq!(call.duration, Some(3));
    }

    #[test]
    fn active_transition_keeps_call_open() {
        let start = OffsetDateTime::now_utc();
        let mut call = session(start);
        call.transition(CallStatus::Active, start + Duration::seconds(5), None);
        assert!(call.end_time.is_none());
        assert!(call.duration.is_none());
        assert!(call.updated_at.is_some());
    }

    #[test]
    fn stats_count_roles_and_average_latency() {
        let start = OffsetDateTime::now_utc();
        let mut call = session(start);
        call.record_utterance(Utterance::new(TranscriptRole::User, "hi".into(), None, start));
        call.record_utterance(Utterance::new(TranscriptRole::Assistant, "hello".into(), Some(1.0), start));
        call.record_utterance(Utterance::new(TranscriptRole::User, "price?".into(), None, start));
        call.record_utterance(Utterance::new(TranscriptRole::Assistant, "ten".into(), Some(2.0), start));
        call.record_utterance(Utterance::new(TranscriptRole::System, "note".into(), None, start));

        let stats = call.stats();
        assert_eq!(stats.total_messages, 5);
        assert_eq!(stats.user_messages, 2);
        assert_eq!(stats.assistant_messages, 2);
        assert_eq!(stats.average_response_time, Some(1.5));
        assert_eq!(stats.total_response_time_entries, 2);
    }

    #[test]
    fn stats_without_latency_have_no_average() {
        let call = session(OffsetDateTime::now_utc());
        let stats = call.stats();
        assert_eq!(stats.total_messages, 0);
        assert!(stats.average_response_time.is_none());
    }

    #[test]
    fn status_parses_lowercase() {
        assert_eq!("busy".parse::<CallStatus>().unwrap(), CallStatus::Busy);
        assert!("ringing".parse::<CallStatus>().is_err());
        assert!(CallStatus::Failed.is_terminal());
        assert!(!CallStatus::Active.is_terminal());
    }
}
