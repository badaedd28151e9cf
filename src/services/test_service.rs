use crate::dto::test_dto::{
    CandidateTestSummary, CreateTestPayload, QuestionPayload, TestDetail, UpdateTestPayload,
};
use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionType};
use crate::models::result::ResultStatus;
use crate::models::test::{Test, TestStatus};
use crate::models::user::{Role, User};
use crate::utils::crypto::hash_password;
use crate::utils::duration::parse_duration_minutes;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashSet;
use url::Url;
use uuid::Uuid;
use validator::Validate;

const TEST_COLUMNS: &str = "id, title, description, duration, password_hash, domain, total_marks, \
     status, allow_multiple_submissions, leaderboard_published, created_by, created_at, updated_at";

#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
}

impl TestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_test(&self, actor: &User, payload: CreateTestPayload) -> Result<TestDetail> {
        payload.validate()?;
        let domain = authoring_domain(actor, payload.domain.as_deref())?;
        let duration_minutes = parse_duration_minutes(&payload.duration).map_err(Error::BadRequest)?;
        validate_questions(&payload.questions)?;
        if payload.questions.iter().any(|q| q.id.is_some()) {
            return Err(Error::BadRequest(
                "New tests cannot reference existing question ids".to_string(),
            ));
        }

        let password_hash = hash_password(&payload.password)?;
        let status = payload.status.unwrap_or(TestStatus::Inactive);

        let mut tx = self.pool.begin().await?;
        let test = sqlx::query_as::<_, Test>(&format!(
            r#"
            INSERT INTO tests (title, description, duration, password_hash, domain, status,
                               allow_multiple_submissions, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TEST_COLUMNS}
            "#
        ))
        .bind(payload.title.trim())
        .bind(payload.description)
        .bind(payload.duration.trim())
        .bind(password_hash)
        .bind(&domain)
        .bind(status.as_str())
        .bind(payload.allow_multiple_submissions.unwrap_or(false))
        .bind(actor.id)
        .fetch_one(&mut *tx)
        .await?;

        for (idx, q) in payload.questions.iter().enumerate() {
            insert_question(&mut tx, test.id, idx as i32 + 1, q).await?;
        }
        let test = refresh_total_marks(&mut tx, test.id).await?;
        let questions = fetch_questions(&mut *tx, test.id).await?;
        tx.commit().await?;

        tracing::info!(test_id = %test.id, domain = %test.domain, questions = questions.len(), "Test created");
        Ok(TestDetail {
            test,
            duration_minutes,
            questions,
        })
    }

    pub async fn get_test(&self, id: Uuid) -> Result<Test> {
        let test = sqlx::query_as::<_, Test>(&format!(
            "SELECT {TEST_COLUMNS} FROM tests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Test not found".to_string()))?;
        Ok(test)
    }

    /// Loads a test the actor is allowed to manage.
    pub async fn get_managed_test(&self, actor: &User, id: Uuid) -> Result<Test> {
        let test = self.get_test(id).await?;
        if !actor.manages_domain(&test.domain) {
            return Err(Error::Forbidden(
                "Test belongs to a domain you do not manage".to_string(),
            ));
        }
        Ok(test)
    }

    pub async fn get_questions(&self, test_id: Uuid) -> Result<Vec<Question>> {
        fetch_questions(&self.pool, test_id).await
    }

    pub async fn get_detail(&self, actor: &User, id: Uuid) -> Result<TestDetail> {
        let test = self.get_managed_test(actor, id).await?;
        let questions = self.get_questions(id).await?;
        Ok(TestDetail {
            duration_minutes: parse_duration_minutes(&test.duration).unwrap_or(0),
            test,
            questions,
        })
    }

    /// Tests visible to a manager: everything for admins, own domain for heads.
    pub async fn list_managed(&self, actor: &User) -> Result<Vec<Test>> {
        let domain = match actor.role() {
            Role::Admin => None,
            Role::Head => Some(
                actor
                    .domain
                    .clone()
                    .ok_or_else(|| Error::Forbidden("Head has no domain assigned".to_string()))?,
            ),
            Role::Candidate => {
                return Err(Error::Forbidden("Not allowed to manage tests".to_string()))
            }
        };
        let tests = sqlx::query_as::<_, Test>(&format!(
            r#"
            SELECT {TEST_COLUMNS} FROM tests
            WHERE ($1::text IS NULL OR domain = $1)
            ORDER BY created_at DESC
            "#
        ))
        .bind(domain)
        .fetch_all(&self.pool)
        .await?;
        Ok(tests)
    }

    /// Active tests of the candidate's domain, with their attempt state.
    pub async fn list_for_candidate(&self, candidate: &User) -> Result<Vec<CandidateTestSummary>> {
        let Some(domain) = candidate.domain.clone() else {
            return Ok(Vec::new());
        };
        let tests = sqlx::query_as::<_, Test>(&format!(
            r#"
            SELECT {TEST_COLUMNS} FROM tests
            WHERE domain = $1 AND status = 'active'
            ORDER BY created_at DESC
            "#
        ))
        .bind(domain)
        .fetch_all(&self.pool)
        .await?;

        let attempts: Vec<(Uuid, Uuid, String)> = sqlx::query_as(
            r#"SELECT id, test_id, status FROM results WHERE candidate_id = $1"#,
        )
        .bind(candidate.id)
        .fetch_all(&self.pool)
        .await?;

        let summaries = tests
            .into_iter()
            .map(|t| {
                let mine: Vec<&(Uuid, Uuid, String)> =
                    attempts.iter().filter(|(_, test_id, _)| *test_id == t.id).collect();
                let in_progress = mine
                    .iter()
                    .find(|(_, _, status)| status == ResultStatus::InProgress.as_str())
                    .map(|(id, _, _)| *id);
                let finished = mine
                    .iter()
                    .any(|(_, _, status)| status != ResultStatus::InProgress.as_str());
                CandidateTestSummary {
                    id: t.id,
                    title: t.title,
                    description: t.description,
                    duration_minutes: parse_duration_minutes(&t.duration).unwrap_or(0),
                    duration: t.duration,
                    domain: t.domain,
                    total_marks: t.total_marks,
                    allow_multiple_submissions: t.allow_multiple_submissions,
                    leaderboard_published: t.leaderboard_published,
                    attempted: finished,
                    can_attempt: in_progress.is_some() || !finished || t.allow_multiple_submissions,
                    in_progress_session: in_progress,
                    created_at: t.created_at,
                }
            })
            .collect();
        Ok(summaries)
    }

    pub async fn update_test(
        &self,
        actor: &User,
        id: Uuid,
        payload: UpdateTestPayload,
    ) -> Result<TestDetail> {
        payload.validate()?;
        let existing = self.get_managed_test(actor, id).await?;
        if let Some(duration) = payload.duration.as_deref() {
            parse_duration_minutes(duration).map_err(Error::BadRequest)?;
        }
        let password_hash = match payload.password.as_deref() {
            Some(p) => Some(hash_password(p)?),
            None => None,
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE tests
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                duration = COALESCE($4, duration),
                password_hash = COALESCE($5, password_hash),
                status = COALESCE($6, status),
                allow_multiple_submissions = COALESCE($7, allow_multiple_submissions),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(payload.title)
        .bind(payload.description)
        .bind(payload.duration)
        .bind(password_hash)
        .bind(payload.status.map(|s| s.as_str()))
        .bind(payload.allow_multiple_submissions)
        .execute(&mut *tx)
        .await?;

        if let Some(questions) = payload.questions.as_ref() {
            validate_questions(questions)?;
            apply_question_diff(&mut tx, existing.id, questions).await?;
        }
        let test = refresh_total_marks(&mut tx, id).await?;
        let questions = fetch_questions(&mut *tx, id).await?;
        tx.commit().await?;

        tracing::info!(test_id = %id, actor = %actor.id, "Test updated");
        Ok(TestDetail {
            duration_minutes: parse_duration_minutes(&test.duration).unwrap_or(0),
            test,
            questions,
        })
    }

    pub async fn set_status(&self, actor: &User, id: Uuid, status: TestStatus) -> Result<Test> {
        self.get_managed_test(actor, id).await?;
        let test = sqlx::query_as::<_, Test>(&format!(
            "UPDATE tests SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {TEST_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(test_id = %id, status = %test.status, "Test status changed");
        Ok(test)
    }

    pub async fn set_leaderboard_published(
        &self,
        actor: &User,
        id: Uuid,
        published: bool,
    ) -> Result<Test> {
        self.get_managed_test(actor, id).await?;
        let test = sqlx::query_as::<_, Test>(&format!(
            "UPDATE tests SET leaderboard_published = $2, updated_at = NOW() WHERE id = $1 RETURNING {TEST_COLUMNS}"
        ))
        .bind(id)
        .bind(published)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(test_id = %id, published, "Leaderboard publication changed");
        Ok(test)
    }

    pub async fn delete_test(&self, actor: &User, id: Uuid) -> Result<()> {
        self.get_managed_test(actor, id).await?;
        sqlx::query("DELETE FROM tests WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        tracing::info!(test_id = %id, actor = %actor.id, "Test deleted");
        Ok(())
    }
}

/// The domain a new test lands in. Heads are pinned to their own domain.
pub fn authoring_domain(actor: &User, requested: Option<&str>) -> Result<String> {
    match actor.role() {
        Role::Admin => requested
            .map(str::to_string)
            .ok_or_else(|| Error::BadRequest("A domain is required".to_string())),
        Role::Head => {
            let own = actor
                .domain
                .clone()
                .ok_or_else(|| Error::Forbidden("Head has no domain assigned".to_string()))?;
            match requested {
                Some(d) if d != own => Err(Error::Forbidden(
                    "Heads can only author tests in their own domain".to_string(),
                )),
                _ => Ok(own),
            }
        }
        Role::Candidate => Err(Error::Forbidden("Candidates cannot author tests".to_string())),
    }
}

pub fn validate_questions(questions: &[QuestionPayload]) -> Result<()> {
    let mut seen_ids = HashSet::new();
    for (idx, q) in questions.iter().enumerate() {
        let n = idx + 1;
        q.validate()?;
        if let Some(id) = q.id {
            if !seen_ids.insert(id) {
                return Err(Error::BadRequest(format!("Question {} repeats id {}", n, id)));
            }
        }
        if let Some(url) = q.image_url.as_deref() {
            let parsed = Url::parse(url)
                .map_err(|_| Error::BadRequest(format!("Question {} has an invalid image URL", n)))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(Error::BadRequest(format!(
                    "Question {} image URL must be http or https",
                    n
                )));
            }
        }
        if q.question_type == QuestionType::Mcq {
            let options: Vec<&str> = q.options.iter().map(|o| o.trim()).collect();
            if options.len() < 2 || options.iter().any(|o| o.is_empty()) {
                return Err(Error::BadRequest(format!(
                    "Question {} needs at least two non-empty options",
                    n
                )));
            }
            let correct = q.correct_answer.as_deref().map(str::trim).unwrap_or("");
            if !options.contains(&correct) {
                return Err(Error::BadRequest(format!(
                    "Question {} correct answer must be one of its options",
                    n
                )));
            }
        }
    }
    Ok(())
}

async fn insert_question(
    tx: &mut Transaction<'_, Postgres>,
    test_id: Uuid,
    position: i32,
    q: &QuestionPayload,
) -> Result<()> {
    let (options, correct) = normalized_options(q);
    sqlx::query(
        r#"
        INSERT INTO questions (test_id, position, text, question_type, options, correct_answer, marks, image_url)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(test_id)
    .bind(position)
    .bind(q.text.trim())
    .bind(q.question_type.as_str())
    .bind(sqlx::types::Json(options))
    .bind(correct)
    .bind(q.marks)
    .bind(q.image_url.as_deref())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Updates questions in place by id, inserts new ones and deletes omitted ones.
/// Existing question ids the edit leaves out. Ids that are not part of the
/// test are rejected.
pub fn removed_questions(existing: &HashSet<Uuid>, questions: &[QuestionPayload]) -> Result<Vec<Uuid>> {
    if let Some(foreign) = questions.iter().filter_map(|q| q.id).find(|id| !existing.contains(id)) {
        return Err(Error::BadRequest(format!(
            "Question {} does not belong to this test",
            foreign
        )));
    }
    let kept: HashSet<Uuid> = questions.iter().filter_map(|q| q.id).collect();
    let mut removed: Vec<Uuid> = existing.difference(&kept).copied().collect();
    removed.sort();
    Ok(removed)
}

async fn apply_question_diff(
    tx: &mut Transaction<'_, Postgres>,
    test_id: Uuid,
    questions: &[QuestionPayload],
) -> Result<()> {
    let existing: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM questions WHERE test_id = $1")
        .bind(test_id)
        .fetch_all(&mut **tx)
        .await?;
    let existing: HashSet<Uuid> = existing.into_iter().collect();
    let removed = removed_questions(&existing, questions)?;

    if !removed.is_empty() {
        let has_results: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM results WHERE test_id = $1)")
                .bind(test_id)
                .fetch_one(&mut **tx)
                .await?;
        if has_results {
            return Err(Error::Conflict(
                "Questions cannot be removed once candidates have attempted the test".to_string(),
            ));
        }
        sqlx::query("DELETE FROM questions WHERE id = ANY($1)")
            .bind(&removed)
            .execute(&mut **tx)
            .await?;
    }

    for (idx, q) in questions.iter().enumerate() {
        match q.id {
            Some(id) => {
                let (options, correct) = normalized_options(q);
                sqlx::query(
                    r#"
                    UPDATE questions
                    SET position = $2, text = $3, question_type = $4, options = $5,
                        correct_answer = $6, marks = $7, image_url = $8
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(idx as i32 + 1)
                .bind(q.text.trim())
                .bind(q.question_type.as_str())
                .bind(sqlx::types::Json(options))
                .bind(correct)
                .bind(q.marks)
                .bind(q.image_url.as_deref())
                .execute(&mut **tx)
                .await?;
            }
            None => insert_question(tx, test_id, idx as i32 + 1, q).await?,
        }
    }
    Ok(())
}

fn normalized_options(q: &QuestionPayload) -> (Vec<String>, Option<String>) {
    if q.question_type == QuestionType::Mcq {
        let options = q.options.iter().map(|o| o.trim().to_string()).collect();
        let correct = q.correct_answer.as_deref().map(|c| c.trim().to_string());
        (options, correct)
    } else {
        let correct = q
            .correct_answer
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        (Vec::new(), correct)
    }
}

async fn refresh_total_marks(tx: &mut Transaction<'_, Postgres>, test_id: Uuid) -> Result<Test> {
    let test = sqlx::query_as::<_, Test>(&format!(
        r#"
        UPDATE tests
        SET total_marks = (SELECT COALESCE(SUM(marks), 0)::int FROM questions WHERE test_id = $1)
        WHERE id = $1
        RETURNING {TEST_COLUMNS}
        "#
    ))
    .bind(test_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(test)
}

pub(crate) async fn fetch_questions<'e, E>(executor: E, test_id: Uuid) -> Result<Vec<Question>>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let questions = sqlx::query_as::<_, Question>(
        r#"
        SELECT id, test_id, position, text, question_type, options, correct_answer, marks, image_url
        FROM questions
        WHERE test_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(test_id)
    .fetch_all(executor)
    .await?;
    Ok(questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn actor(role: &str, domain: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            name: "A".into(),
            email: "a@example.com".into(),
            password_hash: String::new(),
            role: role.into(),
            domain: domain.map(str::to_string),
            blocked: false,
            approved: true,
            email_verified: true,
            verification_token_hash: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn mcq(options: &[&str], correct: Option<&str>) -> QuestionPayload {
        QuestionPayload {
            id: None,
            text: "Pick one".into(),
            question_type: QuestionType::Mcq,
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer: correct.map(str::to_string),
            marks: 2,
            image_url: None,
        }
    }

    #[test]
    fn heads_author_only_in_their_domain() {
        let head = actor("head", Some("ml"));
        assert_eq!(authoring_domain(&head, None).unwrap(), "ml");
        assert_eq!(authoring_domain(&head, Some("ml")).unwrap(), "ml");
        assert!(matches!(authoring_domain(&head, Some("web")), Err(Error::Forbidden(_))));
        assert!(authoring_domain(&actor("admin", None), None).is_err());
        assert_eq!(authoring_domain(&actor("admin", None), Some("web")).unwrap(), "web");
        assert!(authoring_domain(&actor("candidate", Some("ml")), Some("ml")).is_err());
    }

    #[test]
    fn mcq_needs_options_and_matching_answer() {
        assert!(validate_questions(&[mcq(&["a", "b"], Some("b"))]).is_ok());
        assert!(validate_questions(&[mcq(&["a", "b"], Some(" b "))]).is_ok());
        assert!(validate_questions(&[mcq(&["a"], Some("a"))]).is_err());
        assert!(validate_questions(&[mcq(&["a", "b"], Some("c"))]).is_err());
        assert!(validate_questions(&[mcq(&["a", "b"], None)]).is_err());
        assert!(validate_questions(&[mcq(&["a", " "], Some("a"))]).is_err());
    }

    #[test]
    fn long_questions_and_image_urls() {
        let mut long = mcq(&[], None);
        long.question_type = QuestionType::Long;
        assert!(validate_questions(&[long.clone()]).is_ok());

        long.image_url = Some("ftp://example.com/a.png".into());
        assert!(validate_questions(&[long.clone()]).is_err());
        long.image_url = Some("https://example.com/a.png".into());
        assert!(validate_questions(&[long.clone()]).is_ok());

        long.text = String::new();
        assert!(validate_questions(&[long]).is_err());
    }

    #[test]
    fn repeated_question_ids_are_rejected() {
        let id = Uuid::new_v4();
        let mut a = mcq(&["x", "y"], Some("x"));
        a.id = Some(id);
        let b = a.clone();
        assert!(validate_questions(&[a, b]).is_err());
    }

    #[test]
    fn non_mcq_options_are_dropped() {
        let mut code = mcq(&["unused"], Some("  fn main() {} "));
        code.question_type = QuestionType::Code;
        let (options, correct) = normalized_options(&code);
        assert!(options.is_empty());
        assert_eq!(correct.as_deref(), Some("fn main() {}"));
    }

    #[test]
    fn question_edit_keeps_listed_ids_and_removes_the_rest() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let existing: HashSet<Uuid> = [a, b, c].into_iter().collect();
        let with_id = |id: Option<Uuid>| {
            let mut q = mcq(&["x", "y"], Some("x"));
            q.id = id;
            q
        };

        let payload = vec![with_id(Some(b)), with_id(None)];
        let mut expected = vec![a, c];
        expected.sort();
        assert_eq!(removed_questions(&existing, &payload).unwrap(), expected);

        let all = vec![with_id(Some(a)), with_id(Some(b)), with_id(Some(c)), with_id(None)];
        assert!(removed_questions(&existing, &all).unwrap().is_empty());

        let foreign = vec![with_id(Some(a)), with_id(Some(Uuid::new_v4()))];
        assert!(matches!(
            removed_questions(&existing, &foreign),
            Err(Error::BadRequest(_))
        ));
    }
}
