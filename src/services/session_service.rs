use crate::config::Config;
use crate::dto::session_dto::{
    RecordEventResponse, SaveAnswerResponse, SessionView, SubmitSessionPayload,
};
use crate::error::{Error, Result};
use crate::models::monitoring_event::EventKind;
use crate::models::question::Question;
use crate::models::result::{AnswerMap, ResultStatus, TestResult};
use crate::models::test::Test;
use crate::models::user::User;
use crate::services::grading_service::{auto_grade, decimal_marks, total_marks};
use crate::services::monitoring_service::MonitoringService;
use crate::services::test_service::fetch_questions;
use crate::utils::crypto::verify_password;
use crate::utils::duration::parse_duration;
use chrono::{DateTime, Duration, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashSet;
use uuid::Uuid;

pub(crate) const RESULT_COLUMNS: &str = "id, test_id, candidate_id, answers, status, tab_switches, \
     started_at, deadline_at, submitted_at, total_marks_awarded, question_marks, revision, \
     graded_by, graded_at, created_at, updated_at";

/// Timing and anti-cheat limits applied to every session.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    pub tab_switch_limit: i32,
    pub grace: Duration,
}

impl SessionPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tab_switch_limit: config.tab_switch_limit.max(1),
            grace: Duration::seconds(config.submit_grace_seconds.max(0)),
        }
    }

    pub fn remaining_seconds(&self, deadline: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        (deadline - now).num_seconds().max(0)
    }

    /// Answers are accepted up to the deadline plus the grace period.
    pub fn accepts_answers(&self, deadline: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now <= deadline + self.grace
    }

    pub fn finishing_status(
        &self,
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
        client_timer_expired: bool,
    ) -> ResultStatus {
        if client_timer_expired || !self.accepts_answers(deadline, now) {
            ResultStatus::AutoSubmitted
        } else {
            ResultStatus::Submitted
        }
    }

    /// Whether `count` recorded tab switches end the session.
    pub fn limit_reached(&self, count: i32) -> bool {
        count >= self.tab_switch_limit
    }

    pub fn remaining_switches(&self, current: i32) -> i32 {
        (self.tab_switch_limit - current).max(0)
    }
}

#[derive(Clone)]
pub struct SessionService {
    pool: PgPool,
    policy: SessionPolicy,
    monitoring: MonitoringService,
}

impl SessionService {
    pub fn new(pool: PgPool, policy: SessionPolicy) -> Self {
        let monitoring = MonitoringService::new(pool.clone());
        Self {
            pool,
            policy,
            monitoring,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Password-gated start. An unfinished session for the same test is
    /// resumed instead of opening a second one.
    pub async fn start(&self, candidate: &User, test_id: Uuid, password: &str) -> Result<SessionView> {
        let test = self.load_test(test_id).await?;
        if !test.is_active() {
            return Err(Error::Forbidden("This test is not active".to_string()));
        }
        if candidate.domain.as_deref() != Some(test.domain.as_str()) {
            return Err(Error::Forbidden(
                "This test is not offered in your domain".to_string(),
            ));
        }
        if !verify_password(password, &test.password_hash)? {
            tracing::warn!(test_id = %test.id, candidate = %candidate.id, "Session start rejected: wrong password");
            return Err(Error::Forbidden("Incorrect test password".to_string()));
        }

        if let Some(live) = self.find_live(candidate.id, test.id).await? {
            if self.policy.accepts_answers(live.deadline_at, Utc::now()) {
                tracing::info!(session_id = %live.id, "Session resumed");
                return self.view_of(live, &test).await;
            }
            self.finish(live.id, ResultStatus::AutoSubmitted, None).await?;
        }

        if !test.allow_multiple_submissions {
            let finished: bool = sqlx::query_scalar(
                r#"SELECT EXISTS(SELECT 1 FROM results WHERE candidate_id = $1 AND test_id = $2 AND status <> 'in_progress')"#,
            )
            .bind(candidate.id)
            .bind(test.id)
            .fetch_one(&self.pool)
            .await?;
            if finished {
                return Err(Error::Conflict(
                    "You have already submitted this test".to_string(),
                ));
            }
        }

        let duration = parse_duration(&test.duration).map_err(Error::Internal)?;
        let now = Utc::now();
        let inserted = sqlx::query_as::<_, TestResult>(&format!(
            r#"
            INSERT INTO results (test_id, candidate_id, status, started_at, deadline_at)
            VALUES ($1, $2, 'in_progress', $3, $4)
            RETURNING {RESULT_COLUMNS}
            "#
        ))
        .bind(test.id)
        .bind(candidate.id)
        .bind(now)
        .bind(now + duration)
        .fetch_one(&self.pool)
        .await;

        let session = match inserted {
            Ok(row) => row,
            // A concurrent start won the unique index; join that session.
            Err(e) => match Error::from(e) {
                Error::Conflict(_) => self
                    .find_live(candidate.id, test.id)
                    .await?
                    .ok_or_else(|| Error::Conflict("Session could not be started".to_string()))?,
                other => return Err(other),
            },
        };

        tracing::info!(session_id = %session.id, test_id = %test.id, candidate = %candidate.id, deadline = %session.deadline_at, "Session started");
        self.view_of(session, &test).await
    }

    pub async fn view(&self, candidate: &User, session_id: Uuid) -> Result<SessionView> {
        let mut session = self.load_owned(candidate, session_id).await?;
        let test = self.load_test(session.test_id).await?;
        if session.is_in_progress() && !self.policy.accepts_answers(session.deadline_at, Utc::now()) {
            session = self
                .finish(session.id, ResultStatus::AutoSubmitted, None)
                .await?;
        }
        self.view_of(session, &test).await
    }

    pub async fn save_answer(
        &self,
        candidate: &User,
        session_id: Uuid,
        question_id: Uuid,
        answer: String,
    ) -> Result<SaveAnswerResponse> {
        let session = self.load_owned(candidate, session_id).await?;
        if !session.is_in_progress() {
            return Err(Error::Conflict("Session is no longer in progress".to_string()));
        }
        let now = Utc::now();
        if !self.policy.accepts_answers(session.deadline_at, now) {
            self.finish(session.id, ResultStatus::AutoSubmitted, None).await?;
            return Err(Error::Conflict("Time is up; the test has been submitted".to_string()));
        }
        let question_ids = self.question_ids(session.test_id).await?;
        if !question_ids.contains(&question_id) {
            return Err(Error::BadRequest("Question does not belong to this test".to_string()));
        }

        let updated = sqlx::query(
            r#"
            UPDATE results
            SET answers = answers || jsonb_build_object($2::text, $3::text), updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            "#,
        )
        .bind(session.id)
        .bind(question_id.to_string())
        .bind(answer)
        .execute(&self.pool)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(Error::Conflict("Session is no longer in progress".to_string()));
        }

        Ok(SaveAnswerResponse {
            saved: true,
            question_id,
            remaining_seconds: self.policy.remaining_seconds(session.deadline_at, now),
        })
    }

    /// Logs a monitoring event. Tab switches count towards the limit; reaching
    /// it submits the session as `auto-submitted`.
    pub async fn record_event(
        &self,
        candidate: &User,
        session_id: Uuid,
        kind: EventKind,
        content: Option<String>,
    ) -> Result<RecordEventResponse> {
        let session = self.load_owned(candidate, session_id).await?;
        self.monitoring.append(&session, kind, content).await?;

        if kind != EventKind::TabSwitch || !session.is_in_progress() {
            return Ok(RecordEventResponse {
                tab_switches: session.tab_switches,
                remaining_switches: self.policy.remaining_switches(session.tab_switches),
                terminated: false,
                status: session.status,
            });
        }

        let counted: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE results SET tab_switches = tab_switches + 1, updated_at = NOW()
            WHERE id = $1 AND status = 'in_progress'
            RETURNING tab_switches
            "#,
        )
        .bind(session.id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(count) = counted else {
            let current = self.load_owned(candidate, session_id).await?;
            return Ok(RecordEventResponse {
                tab_switches: current.tab_switches,
                remaining_switches: self.policy.remaining_switches(current.tab_switches),
                terminated: false,
                status: current.status,
            });
        };

        let limit_reached = self.policy.limit_reached(count);
        let status = if limit_reached {
            tracing::warn!(session_id = %session.id, candidate = %candidate.id, tab_switches = count, "Tab switch limit reached, auto-submitting");
            let finished = self
                .finish(session.id, ResultStatus::AutoSubmitted, None)
                .await?;
            finished.status
        } else {
            tracing::info!(session_id = %session.id, tab_switches = count, "Tab switch recorded");
            ResultStatus::InProgress.as_str().to_string()
        };

        Ok(RecordEventResponse {
            tab_switches: count,
            remaining_switches: self.policy.remaining_switches(count),
            terminated: limit_reached,
            status,
        })
    }

    pub async fn submit(
        &self,
        candidate: &User,
        session_id: Uuid,
        payload: SubmitSessionPayload,
    ) -> Result<TestResult> {
        let session = self.load_owned(candidate, session_id).await?;
        if !session.is_in_progress() {
            return Err(Error::Conflict("This test has already been submitted".to_string()));
        }
        let now = Utc::now();
        let status = self
            .policy
            .finishing_status(session.deadline_at, now, payload.auto);
        let final_answers = if self.policy.accepts_answers(session.deadline_at, now) {
            payload.answers
        } else {
            tracing::warn!(session_id = %session.id, "Late submission, keeping only answers saved before the deadline");
            None
        };
        if let Some(answers) = final_answers.as_ref() {
            let question_ids = self.question_ids(session.test_id).await?;
            if let Some(unknown) = answers.keys().find(|id| !question_ids.contains(id)) {
                return Err(Error::BadRequest(format!(
                    "Question {} does not belong to this test",
                    unknown
                )));
            }
        }

        self.finish(session.id, status, final_answers).await
    }

    /// Finishes every live session whose deadline and grace have passed.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let cutoff = Utc::now() - self.policy.grace;
        let expired: Vec<Uuid> = sqlx::query_scalar(
            r#"SELECT id FROM results WHERE status = 'in_progress' AND deadline_at < $1"#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut finished = 0;
        for id in expired {
            match self.finish(id, ResultStatus::AutoSubmitted, None).await {
                Ok(_) => finished += 1,
                Err(Error::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
        }
        if finished > 0 {
            tracing::info!(count = finished, "Expired sessions auto-submitted");
        }
        Ok(finished)
    }

    /// Moves an in-progress row to a finished status and auto-grades it.
    async fn finish(
        &self,
        result_id: Uuid,
        status: ResultStatus,
        extra_answers: Option<AnswerMap>,
    ) -> Result<TestResult> {
        let mut tx = self.pool.begin().await?;
        let current = sqlx::query_as::<_, TestResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results WHERE id = $1 FOR UPDATE"
        ))
        .bind(result_id)
        .fetch_one(&mut *tx)
        .await?;
        if !current.is_in_progress() {
            return Err(Error::Conflict("This test has already been submitted".to_string()));
        }

        let mut answers = current.answers.0.clone();
        if let Some(extra) = extra_answers {
            answers.extend(extra);
        }
        let questions: Vec<Question> = fetch_questions(&mut *tx, current.test_id).await?;
        let marks = auto_grade(&questions, &answers);
        let total = decimal_marks(total_marks(&marks));

        let finished = sqlx::query_as::<_, TestResult>(&format!(
            r#"
            UPDATE results
            SET status = $2, answers = $3, question_marks = $4, total_marks_awarded = $5,
                submitted_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {RESULT_COLUMNS}
            "#
        ))
        .bind(result_id)
        .bind(status.as_str())
        .bind(Json(&answers))
        .bind(Json(&marks))
        .bind(total)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(result_id = %finished.id, status = %finished.status, answered = answers.len(), "Session finished");
        Ok(finished)
    }

    async fn load_test(&self, test_id: Uuid) -> Result<Test> {
        let test = sqlx::query_as::<_, Test>(
            r#"
            SELECT id, title, description, duration, password_hash, domain, total_marks, status,
                   allow_multiple_submissions, leaderboard_published, created_by, created_at, updated_at
            FROM tests WHERE id = $1
            "#,
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Test not found".to_string()))?;
        Ok(test)
    }

    async fn find_live(&self, candidate_id: Uuid, test_id: Uuid) -> Result<Option<TestResult>> {
        let row = sqlx::query_as::<_, TestResult>(&format!(
            r#"
            SELECT {RESULT_COLUMNS} FROM results
            WHERE candidate_id = $1 AND test_id = $2 AND status = 'in_progress'
            "#
        ))
        .bind(candidate_id)
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn load_owned(&self, candidate: &User, session_id: Uuid) -> Result<TestResult> {
        let row = sqlx::query_as::<_, TestResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results WHERE id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Session not found".to_string()))?;
        if row.candidate_id != candidate.id {
            return Err(Error::NotFound("Session not found".to_string()));
        }
        Ok(row)
    }

    async fn question_ids(&self, test_id: Uuid) -> Result<HashSet<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM questions WHERE test_id = $1")
            .bind(test_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    async fn view_of(&self, session: TestResult, test: &Test) -> Result<SessionView> {
        let questions = fetch_questions(&self.pool, test.id).await?;
        let now = Utc::now();
        let remaining = if session.is_in_progress() {
            self.policy.remaining_seconds(session.deadline_at, now)
        } else {
            0
        };
        Ok(SessionView {
            session_id: session.id,
            test_id: test.id,
            title: test.title.clone(),
            status: session.status,
            started_at: session.started_at,
            deadline_at: session.deadline_at,
            remaining_seconds: remaining,
            tab_switches: session.tab_switches,
            tab_switch_limit: self.policy.tab_switch_limit,
            questions: questions.iter().map(Question::for_candidate).collect(),
            answers: session.answers.0,
        })
    }
}
