use crate::error::Result;
use crate::models::monitoring_event::{EventKind, MonitoringEvent};
use crate::models::result::TestResult;
use crate::models::user::User;
use crate::services::test_service::TestService;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct MonitoringService {
    pool: PgPool,
}

impl MonitoringService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append(
        &self,
        session: &TestResult,
        kind: EventKind,
        content: Option<String>,
    ) -> Result<MonitoringEvent> {
        let event = sqlx::query_as::<_, MonitoringEvent>(
            r#"
            INSERT INTO monitoring_events (result_id, test_id, candidate_id, kind, content)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, result_id, test_id, candidate_id, kind, content, created_at
            "#,
        )
        .bind(session.id)
        .bind(session.test_id)
        .bind(session.candidate_id)
        .bind(kind.as_str())
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        tracing::debug!(session_id = %session.id, kind = kind.as_str(), "Monitoring event recorded");
        Ok(event)
    }

    /// Events of a test, newest first, optionally narrowed to one candidate.
    pub async fn list_events(
        &self,
        actor: &User,
        test_id: Uuid,
        candidate_id: Option<Uuid>,
    ) -> Result<Vec<MonitoringEvent>> {
        let test = TestService::new(self.pool.clone())
            .get_managed_test(actor, test_id)
            .await?;
        let events = sqlx::query_as::<_, MonitoringEvent>(
            r#"
            SELECT id, result_id, test_id, candidate_id, kind, content, created_at
            FROM monitoring_events
            WHERE test_id = $1 AND ($2::uuid IS NULL OR candidate_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(test.id)
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}
