use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

pub type AnswerMap = BTreeMap<Uuid, String>;
pub type MarkMap = BTreeMap<Uuid, f64>;

/// One attempt of one candidate at one test. While `status` is `in_progress`
/// the row doubles as the live session.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestResult {
    pub id: Uuid,
    pub test_id: Uuid,
    pub candidate_id: Uuid,
    pub answers: Json<AnswerMap>,
    pub status: String,
    pub tab_switches: i32,
    pub started_at: DateTime<Utc>,
    pub deadline_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub total_marks_awarded: Option<Decimal>,
    pub question_marks: Json<MarkMap>,
    pub revision: i32,
    pub graded_by: Option<Uuid>,
    pub graded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestResult {
    pub fn status(&self) -> ResultStatus {
        self.status.parse().unwrap_or(ResultStatus::Submitted)
    }

    pub fn is_in_progress(&self) -> bool {
        self.status() == ResultStatus::InProgress
    }

    pub fn time_taken_seconds(&self) -> Option<i64> {
        self.submitted_at
            .map(|end| (end - self.started_at).num_seconds().max(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    #[serde(rename = "in_progress")]
    InProgress,
    #[serde(rename = "submitted")]
    Submitted,
    #[serde(rename = "auto-submitted")]
    AutoSubmitted,
    #[serde(rename = "evaluated")]
    Evaluated,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::InProgress => "in_progress",
            ResultStatus::Submitted => "submitted",
            ResultStatus::AutoSubmitted => "auto-submitted",
            ResultStatus::Evaluated => "evaluated",
        }
    }
}

impl FromStr for ResultStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(ResultStatus::InProgress),
            "submitted" => Ok(ResultStatus::Submitted),
            "auto-submitted" => Ok(ResultStatus::AutoSubmitted),
            "evaluated" => Ok(ResultStatus::Evaluated),
            other => Err(format!("Unknown result status '{}'", other)),
        }
    }
}
