use crate::dto::grading_dto::{GradePayload, ResultWithCandidate};
use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionType};
use crate::models::result::{AnswerMap, MarkMap, ResultStatus, TestResult};
use crate::models::user::{Role, User};
use crate::services::session_service::RESULT_COLUMNS;
use crate::services::test_service::{fetch_questions, TestService};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

/// Marks MCQ answers against the stored correct option. Unanswered questions
/// of any type score zero; answered long and code questions are left for a
/// grader.
pub fn auto_grade(questions: &[Question], answers: &AnswerMap) -> MarkMap {
    let mut marks = MarkMap::new();
    for q in questions {
        let given = answers.get(&q.id).map(|a| a.trim()).filter(|a| !a.is_empty());
        match (q.kind(), given) {
            (_, None) => {
                marks.insert(q.id, 0.0);
            }
            (Some(QuestionType::Mcq), Some(answer)) => {
                let correct = q
                    .correct_answer
                    .as_deref()
                    .is_some_and(|c| c.trim().eq_ignore_ascii_case(answer));
                marks.insert(q.id, if correct { f64::from(q.marks) } else { 0.0 });
            }
            _ => {}
        }
    }
    marks
}

pub fn total_marks(marks: &MarkMap) -> f64 {
    marks.values().sum()
}

pub fn decimal_marks(total: f64) -> Option<Decimal> {
    Decimal::from_f64(total).map(|d| d.round_dp(2))
}

/// Every awarded mark must target a question of the test and lie within
/// `[0, question.marks]`.
pub fn validate_marks(questions: &[Question], marks: &MarkMap) -> Result<()> {
    let by_id: HashMap<Uuid, &Question> = questions.iter().map(|q| (q.id, q)).collect();
    for (question_id, awarded) in marks {
        let question = by_id.get(question_id).ok_or_else(|| {
            Error::BadRequest(format!("Question {} does not belong to this test", question_id))
        })?;
        if !awarded.is_finite() || *awarded < 0.0 || *awarded > f64::from(question.marks) {
            return Err(Error::BadRequest(format!(
                "Marks for question {} must be between 0 and {}",
                question.position, question.marks
            )));
        }
    }
    Ok(())
}

/// Applies a grader's marks over the stored ones. The merged map is checked
/// as a whole: a stored mark can be out of bounds after the test was edited.
pub fn merge_marks(questions: &[Question], stored: &MarkMap, incoming: &MarkMap) -> Result<MarkMap> {
    validate_marks(questions, incoming)?;
    let mut merged = stored.clone();
    merged.extend(incoming.iter().map(|(k, v)| (*k, *v)));
    validate_marks(questions, &merged)?;
    Ok(merged)
}

pub fn missing_marks(questions: &[Question], marks: &MarkMap) -> Vec<i32> {
    questions
        .iter()
        .filter(|q| !marks.contains_key(&q.id))
        .map(|q| q.position)
        .collect()
}

#[derive(Debug, FromRow)]
struct ResultRow {
    #[sqlx(flatten)]
    result: TestResult,
    candidate_name: String,
    candidate_email: String,
}

#[derive(Clone)]
pub struct GradingService {
    pool: PgPool,
    tests: TestService,
}

impl GradingService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tests: TestService::new(pool.clone()),
            pool,
        }
    }

    pub async fn list_results(&self, actor: &User, test_id: Uuid) -> Result<Vec<ResultWithCandidate>> {
        let test = self.tests.get_managed_test(actor, test_id).await?;
        let rows = sqlx::query_as::<_, ResultRow>(&format!(
            r#"
            SELECT {cols}, u.name AS candidate_name, u.email AS candidate_email
            FROM results r
            JOIN users u ON u.id = r.candidate_id
            WHERE r.test_id = $1
            ORDER BY r.submitted_at DESC NULLS FIRST, r.created_at DESC
            "#,
            cols = prefixed_columns("r")
        ))
        .bind(test.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ResultRow::into_dto).collect())
    }

    /// A candidate's own results. Marks stay hidden until evaluation.
    pub async fn list_own(&self, candidate: &User) -> Result<Vec<TestResult>> {
        let rows = sqlx::query_as::<_, TestResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results WHERE candidate_id = $1 ORDER BY created_at DESC"
        ))
        .bind(candidate.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(redact_for_candidate).collect())
    }

    pub async fn get_result(&self, actor: &User, result_id: Uuid) -> Result<TestResult> {
        let result = self.load(result_id).await?;
        if actor.role() == Role::Candidate {
            if result.candidate_id != actor.id {
                return Err(Error::NotFound("Result not found".to_string()));
            }
            return Ok(redact_for_candidate(result));
        }
        self.tests.get_managed_test(actor, result.test_id).await?;
        Ok(result)
    }

    pub async fn grade(&self, actor: &User, result_id: Uuid, payload: GradePayload) -> Result<TestResult> {
        let current = self.load(result_id).await?;
        if actor.role() == Role::Candidate {
            return Err(Error::Forbidden("Candidates cannot grade results".to_string()));
        }
        self.tests.get_managed_test(actor, current.test_id).await?;

        let mut tx = self.pool.begin().await?;
        let locked = sqlx::query_as::<_, TestResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results WHERE id = $1 FOR UPDATE"
        ))
        .bind(result_id)
        .fetch_one(&mut *tx)
        .await?;

        if locked.is_in_progress() {
            return Err(Error::Conflict(
                "The candidate is still taking this test".to_string(),
            ));
        }
        if let Some(expected) = payload.expected_revision {
            if expected != locked.revision {
                return Err(Error::Conflict(format!(
                    "Result was modified by another grader (revision {} != {})",
                    locked.revision, expected
                )));
            }
        }

        let questions = fetch_questions(&mut *tx, locked.test_id).await?;
        let marks = merge_marks(&questions, &locked.question_marks.0, &payload.question_marks)?;
        let status = if payload.finalize {
            let missing = missing_marks(&questions, &marks);
            if !missing.is_empty() {
                return Err(Error::BadRequest(format!(
                    "Questions {:?} have not been marked yet",
                    missing
                )));
            }
            ResultStatus::Evaluated.as_str().to_string()
        } else {
            locked.status.clone()
        };
        let total = decimal_marks(total_marks(&marks));

        let graded = sqlx::query_as::<_, TestResult>(&format!(
            r#"
            UPDATE results
            SET question_marks = $2, total_marks_awarded = $3, status = $4,
                revision = revision + 1, graded_by = $5, graded_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND revision = $6
            RETURNING {RESULT_COLUMNS}
            "#
        ))
        .bind(result_id)
        .bind(Json(&marks))
        .bind(total)
        .bind(&status)
        .bind(actor.id)
        .bind(locked.revision)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::Conflict("Result was modified by another grader".to_string()))?;
        tx.commit().await?;

        tracing::info!(result_id = %graded.id, grader = %actor.id, status = %graded.status, revision = graded.revision, "Result graded");
        Ok(graded)
    }

    pub async fn delete_result(&self, actor: &User, result_id: Uuid) -> Result<TestResult> {
        let result = self.load(result_id).await?;
        if actor.role() == Role::Candidate {
            return Err(Error::Forbidden("Candidates cannot delete results".to_string()));
        }
        self.tests.get_managed_test(actor, result.test_id).await?;

        sqlx::query("DELETE FROM results WHERE id = $1")
            .bind(result_id)
            .execute(&self.pool)
            .await?;
        tracing::info!(%result_id, actor = %actor.id, "Result deleted");
        Ok(result)
    }

    async fn load(&self, result_id: Uuid) -> Result<TestResult> {
        sqlx::query_as::<_, TestResult>(&format!(
            "SELECT {RESULT_COLUMNS} FROM results WHERE id = $1"
        ))
        .bind(result_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Result not found".to_string()))
    }
}

impl ResultRow {
    fn into_dto(self) -> ResultWithCandidate {
        ResultWithCandidate {
            result: self.result,
            candidate_name: self.candidate_name,
            candidate_email: self.candidate_email,
        }
    }
}

fn prefixed_columns(alias: &str) -> String {
    RESULT_COLUMNS
        .split(',')
        .map(|c| format!("{}.{}", alias, c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn redact_for_candidate(mut result: TestResult) -> TestResult {
    if result.status() != ResultStatus::Evaluated {
        result.total_marks_awarded = None;
        result.question_marks = Json(MarkMap::new());
        result.graded_by = None;
    }
    result
}
