use crate::error::{Error, Result};
use crate::models::test::Test;
use crate::models::user::{Role, User};
use crate::services::test_service::TestService;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::cmp::Ordering;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ScoredResult {
    pub result_id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub marks: Decimal,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl ScoredResult {
    fn time_taken_seconds(&self) -> Option<i64> {
        self.submitted_at
            .map(|end| (end - self.started_at).num_seconds().max(0))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub result_id: Uuid,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub marks: Decimal,
    pub total_marks: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
    pub time_taken_seconds: Option<i64>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub test_id: Uuid,
    pub title: String,
    pub total_marks: i32,
    pub published: bool,
    pub entries: Vec<LeaderboardEntry>,
}

pub fn percentage(marks: Decimal, total: i32) -> Decimal {
    if total <= 0 {
        return Decimal::ZERO;
    }
    (marks * Decimal::ONE_HUNDRED / Decimal::from(total)).round_dp(2)
}

/// Sorts by marks descending, then time taken ascending, and assigns dense
/// ranks: ties on both keys share a rank.
pub fn rank_entries(mut rows: Vec<ScoredResult>, total_marks: i32) -> Vec<LeaderboardEntry> {
    let time_key = |r: &ScoredResult| r.time_taken_seconds().unwrap_or(i64::MAX);
    rows.sort_by(|a, b| match b.marks.cmp(&a.marks) {
        Ordering::Equal => time_key(a).cmp(&time_key(b)),
        other => other,
    });

    let mut entries = Vec::with_capacity(rows.len());
    let mut rank = 0u32;
    let mut previous: Option<(Decimal, i64)> = None;
    for row in rows {
        let key = (row.marks, time_key(&row));
        if previous != Some(key) {
            rank += 1;
            previous = Some(key);
        }
        entries.push(LeaderboardEntry {
            rank,
            percentage: percentage(row.marks, total_marks),
            time_taken_seconds: row.time_taken_seconds(),
            result_id: row.result_id,
            candidate_id: row.candidate_id,
            candidate_name: row.candidate_name,
            marks: row.marks,
            total_marks,
            submitted_at: row.submitted_at,
        });
    }
    entries
}

#[derive(Clone)]
pub struct LeaderboardService {
    pool: PgPool,
    tests: TestService,
}

impl LeaderboardService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            tests: TestService::new(pool.clone()),
            pool,
        }
    }

    pub async fn leaderboard(&self, actor: &User, test_id: Uuid) -> Result<Leaderboard> {
        let test = self.visible_test(actor, test_id).await?;
        let rows = sqlx::query_as::<_, ScoredResult>(
            r#"
            SELECT r.id AS result_id, r.candidate_id, u.name AS candidate_name,
                   COALESCE(r.total_marks_awarded, 0) AS marks, r.started_at, r.submitted_at
            FROM results r
            JOIN users u ON u.id = r.candidate_id
            WHERE r.test_id = $1 AND r.status = 'evaluated'
            "#,
        )
        .bind(test.id)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(test_id = %test.id, entries = rows.len(), "Leaderboard computed");
        Ok(Leaderboard {
            entries: rank_entries(rows, test.total_marks),
            test_id: test.id,
            title: test.title,
            total_marks: test.total_marks,
            published: test.leaderboard_published,
        })
    }

    async fn visible_test(&self, actor: &User, test_id: Uuid) -> Result<Test> {
        if actor.role() != Role::Candidate {
            return self.tests.get_managed_test(actor, test_id).await;
        }
        let test = self.tests.get_test(test_id).await?;
        if !test.leaderboard_published || actor.domain.as_deref() != Some(test.domain.as_str()) {
            return Err(Error::Forbidden(
                "The leaderboard for this test has not been published".to_string(),
            ));
        }
        Ok(test)
    }
}
