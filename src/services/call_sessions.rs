//! Call session tracking.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::{CallSession, CallSessionStats, CallStatus, NewCallSession, Utterance};
use crate::schemas::{CallSessionCreate, CallSessionList, CallSessionListQuery, TranscriptAppend};
use crate::store::Store;

/// Call session service.
#[derive(Clone)]
pub struct CallSessionService {
    store: Arc<dyn Store>,
}

impl CallSessionService {
    /// Create a new call session service.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Open a session with one of the tenant's agents.
    #[instrument(skip(self, request), fields(agent_id = %request.agent_id))]
    pub async fn create(&self, tenant_id: Uuid, user_id: Uuid, request: CallSessionCreate) -> Result<CallSession> {
        let request = request.validate()?;
        if self.store.get_agent(request.agent_id, tenant_id).await?.is_none() {
            return Err(AppError::NotFound("Agent not found".to_string()));
        }

        let session = self
            .store
            .create_call_session(NewCallSession {
                user_id,
                agent_id: request.agent_id,
                tenant_id,
                twilio_call_sid: request.twilio_call_sid,
                from_number: request.from_number,
                to_number: request.to_number,
            })
            .await?;

        metrics::inc_calls_started();
        info!(session_id = %session.id, "Call session started");
        Ok(session)
    }

    /// The caller's sessions in the tenant, newest first.
    pub async fn list(&self, tenant_id: Uuid, user_id: Uuid, query: CallSessionListQuery) -> Result<CallSessionList> {
        let filter = query.validate(tenant_id, user_id)?;
        let (sessions, total) = self.store.list_call_sessions(&filter).await?;
        Ok(CallSessionList { sessions, total })
    }

    /// Fetch a session owned by the caller within the tenant.
    pub async fn get(&self, tenant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<CallSession> {
        let session = self
            .store
            .get_call_session(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Call session not found".to_string()))?;
        if session.tenant_id != tenant_id || session.user_id != user_id {
            return Err(AppError::Forbidden(
                "Not authorized to access this call session".to_string(),
            ));
        }
        Ok(session)
    }

    pub async fn stats(&self, tenant_id: Uuid, user_id: Uuid, id: Uuid) -> Result<CallSessionStats> {
        Ok(self.get(tenant_id, user_id, id).await?.stats())
    }

    /// Append an utterance to the transcript.
    #[instrument(skip(self, entry))]
    pub async fn append_transcript(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        entry: TranscriptAppend,
    ) -> Result<CallSession> {
        let entry = entry.validate()?;
        self.get(tenant_id, user_id, id).await?;
        let utterance = Utterance::new(
            entry.role,
            entry.content,
            entry.response_time,
            OffsetDateTime::now_utc(),
        );
        self.store
            .append_utterance(id, &utterance)
            .await?
            .ok_or_else(|| AppError::NotFound("Call session not found".to_string()))
    }

    /// Move a session to `status`.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        id: Uuid,
        status: CallStatus,
    ) -> Result<CallSession> {
        let mut session = self.get(tenant_id, user_id, id).await?;
        self.transition(&mut session, status, None).await?;
        Ok(session)
    }

    /// Apply a provider status callback to the session with `call_sid`.
    ///
    /// Returns `None` when no session carries that SID.
    #[instrument(skip(self))]
    pub async fn apply_provider_status(
        &self,
        call_sid: &str,
        status: CallStatus,
        reported_duration: Option<i32>,
    ) -> Result<Option<CallSession>> {
        let Some(mut session) = self.store.find_call_session_by_sid(call_sid).await? else {
            warn!(call_sid, "Status callback for unknown call");
            return Ok(None);
        };
        self.transition(&mut session, status, reported_duration).await?;
        Ok(Some(session))
    }

    async fn transition(
        &self,
        session: &mut CallSession,
        status: CallStatus,
        reported_duration: Option<i32>,
    ) -> Result<()> {
        let was_terminal = session.status.is_terminal();
        session.transition(status, OffsetDateTime::now_utc(), reported_duration);
        *session = self
            .store
            .save_call_status(session)
            .await?
            .ok_or_else(|| AppError::NotFound("Call session not found".to_string()))?;

        if status.is_terminal() && !was_terminal {
            metrics::inc_calls_ended(status.as_ref());
            info!(
                session_id = %session.id,
                status = %status,
                duration = session.duration,
                "Call session ended"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewAgent, NewTenant, NewUser, TranscriptRole, ADMIN_ROLE};
    use crate::store::MemoryStore;

    struct Fixture {
        service: CallSessionService,
        tenant_id: Uuid,
        user_id: Uuid,
        agent_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                first_name: "A".to_string(),
                last_name: "B".to_string(),
                email: "a@example.com".to_string(),
                phone: None,
                hashed_password: "hash".to_string(),
                current_tenant_id: None,
            })
            .await
            .unwrap();
        let admin = store.find_role_by_name(ADMIN_ROLE).await.unwrap().unwrap();
        let tenant = store
            .create_tenant(
                NewTenant {
                    name: "Acme".to_string(),
                    schema_name: "acme_schema".to_string(),
                    admin_id: user.id,
                },
                admin.id,
            )
            .await
            .unwrap();
        let agent = store
            .create_agent(
                tenant.id,
                NewAgent {
                    name: "Reception".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        Fixture {
            service: CallSessionService::new(store),
            tenant_id: tenant.id,
            user_id: user.id,
            agent_id: agent.id,
        }
    }

    fn create(agent_id: Uuid, sid: Option<&str>) -> CallSessionCreate {
        CallSessionCreate {
            agent_id,
            twilio_call_sid: sid.map(str::to_string),
            from_number: Some("+15550001111".to_string()),
            to_number: None,
        }
    }

    #[tokio::test]
    async fn transcript_feeds_stats() {
        let f = fixture().await;
        let session = f
            .service
            .create(f.tenant_id, f.user_id, create(f.agent_id, None))
            .await
            .unwrap();
        assert_eq!(session.status, CallStatus::Active);

        for (role, response_time) in [
            (TranscriptRole::User, None),
            (TranscriptRole::Assistant, Some(1.0)),
            (TranscriptRole::Assistant, Some(2.0)),
        ] {
            f.service
                .append_transcript(
                    f.tenant_id,
                    f.user_id,
                    session.id,
                    TranscriptAppend {
                        role,
                        content: "hello".to_string(),
                        response_time,
                    },
                )
                .await
                .unwrap();
        }

        let stats = f.service.stats(f.tenant_id, f.user_id, session.id).await.unwrap();
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.user_messages, 1);
        assert_eq!(stats.assistant_messages, 2);
        assert_eq!(stats.average_response_time, Some(1.5));
    }

    #[tokio::test]
    async fn other_users_are_forbidden() {
        let f = fixture().await;
        let session = f
            .service
            .create(f.tenant_id, f.user_id, create(f.agent_id, None))
            .await
            .unwrap();
        let err = f
            .service
            .get(f.tenant_id, Uuid::new_v4(), session.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn provider_status_ends_session() {
        let f = fixture().await;
        f.service
            .create(f.tenant_id, f.user_id, create(f.agent_id, Some("CA123")))
            .await
            .unwrap();

        let updated = f
            .service
            .apply_provider_status("CA123", CallStatus::Completed, Some(42))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, CallStatus::Completed);
        assert_eq!(updated.duration, Some(42));
        assert!(updated.end_time.is_some());

        assert!(f
            .service
            .apply_provider_status("CA-unknown", CallStatus::Failed, None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn unknown_agent_is_not_found() {
        let f = fixture().await;
        let err = f
            .service
            .create(f.tenant_id, f.user_id, create(Uuid::new_v4(), None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn concurrent_appends_and_status_updates_all_land() {
        let f = fixture().await;
        let session = f
            .service
            .create(f.tenant_id, f.user_id, create(f.agent_id, Some("CA9")))
            .await
            .unwrap();
        let line = |content: &str| TranscriptAppend {
            role: TranscriptRole::User,
            content: content.to_string(),
            response_time: None,
        };

        let (first, second, ended) = tokio::join!(
            f.service.append_transcript(f.tenant_id, f.user_id, session.id, line("one")),
            f.service.append_transcript(f.tenant_id, f.user_id, session.id, line("two")),
            f.service.apply_provider_status("CA9", CallStatus::Completed, Some(7)),
        );
        first.unwrap();
        second.unwrap();
        ended.unwrap().unwrap();

        let stored = f.service.get(f.tenant_id, f.user_id, session.id).await.unwrap();
        assert_eq!(stored.call_transcript.len(), 2);
        assert_eq!(stored.status, CallStatus::Completed);
        assert_eq!(stored.duration, Some(7));
    }
}
