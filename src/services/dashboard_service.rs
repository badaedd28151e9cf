use crate::error::{Error, Result};
use crate::models::user::{Role, User};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Serialize, FromRow)]
pub struct AdminStats {
    pub candidates: i64,
    pub heads: i64,
    pub admins: i64,
    pub pending_head_approvals: i64,
    pub blocked_users: i64,
    pub tests: i64,
    pub active_tests: i64,
    pub results: i64,
    pub awaiting_evaluation: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct HeadStats {
    pub tests: i64,
    pub active_tests: i64,
    pub candidates: i64,
    pub awaiting_evaluation: i64,
    pub evaluated: i64,
}

#[derive(Debug, Serialize, FromRow)]
pub struct CandidateResultSummary {
    pub result_id: Uuid,
    pub test_id: Uuid,
    pub title: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct CandidateStats {
    pub available_tests: i64,
    pub results: Vec<CandidateResultSummary>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    Admin(AdminStats),
    Head(HeadStats),
    Candidate(CandidateStats),
}

#[derive(Clone)]
pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn dashboard(&self, actor: &User) -> Result<Dashboard> {
        match actor.role() {
            Role::Admin => self.admin().await.map(Dashboard::Admin),
            Role::Head => {
                let domain = actor
                    .domain
                    .as_deref()
                    .ok_or_else(|| Error::Forbidden("Head has no domain assigned".to_string()))?;
                self.head(domain).await.map(Dashboard::Head)
            }
            Role::Candidate => self.candidate(actor).await.map(Dashboard::Candidate),
        }
    }

    async fn admin(&self) -> Result<AdminStats> {
        let stats = sqlx::query_as::<_, AdminStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users WHERE role = 'candidate') AS candidates,
                (SELECT COUNT(*) FROM users WHERE role = 'head') AS heads,
                (SELECT COUNT(*) FROM users WHERE role = 'admin') AS admins,
                (SELECT COUNT(*) FROM users WHERE role = 'head' AND NOT approved) AS pending_head_approvals,
                (SELECT COUNT(*) FROM users WHERE blocked) AS blocked_users,
                (SELECT COUNT(*) FROM tests) AS tests,
                (SELECT COUNT(*) FROM tests WHERE status = 'active') AS active_tests,
                (SELECT COUNT(*) FROM results) AS results,
                (SELECT COUNT(*) FROM results WHERE status IN ('submitted', 'auto-submitted')) AS awaiting_evaluation
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn head(&self, domain: &str) -> Result<HeadStats> {
        let stats = sqlx::query_as::<_, HeadStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM tests WHERE domain = $1) AS tests,
                (SELECT COUNT(*) FROM tests WHERE domain = $1 AND status = 'active') AS active_tests,
                (SELECT COUNT(*) FROM users WHERE role = 'candidate' AND domain = $1) AS candidates,
                (SELECT COUNT(*) FROM results r JOIN tests t ON t.id = r.test_id
                    WHERE t.domain = $1 AND r.status IN ('submitted', 'auto-submitted')) AS awaiting_evaluation,
                (SELECT COUNT(*) FROM results r JOIN tests t ON t.id = r.test_id
                    WHERE t.domain = $1 AND r.status = 'evaluated') AS evaluated
            "#,
        )
        .bind(domain)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn candidate(&self, candidate: &User) -> Result<CandidateStats> {
        let available_tests: i64 = match candidate.domain.as_deref() {
            Some(domain) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM tests WHERE domain = $1 AND status = 'active'",
                )
                .bind(domain)
                .fetch_one(&self.pool)
                .await?
            }
            None => 0,
        };
        let results = sqlx::query_as::<_, CandidateResultSummary>(
            r#"
            SELECT r.id AS result_id, r.test_id, t.title, r.status
            FROM results r
            JOIN tests t ON t.id = r.test_id
            WHERE r.candidate_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(candidate.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(CandidateStats {
            available_tests,
            results,
        })
    }
}
