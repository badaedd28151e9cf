use super::auth_dto::trim_optional_string;
use crate::models::question::{Question, QuestionType};
use crate::models::test::{Test, TestStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct QuestionPayload {
    /// Present when editing an existing question in place.
    pub id: Option<Uuid>,
    #[validate(length(min = 1, message = "Question text cannot be empty"))]
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
    #[validate(range(min = 0, max = 1000, message = "Marks must be between 0 and 1000"))]
    pub marks: i32,
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTestPayload {
    #[validate(length(min = 1, max = 300, message = "Title cannot be empty"))]
    pub title: String,
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub description: Option<String>,
    #[validate(length(min = 1, message = "Duration cannot be empty"))]
    pub duration: String,
    #[validate(length(min = 1, max = 128, message = "Password cannot be empty"))]
    pub password: String,
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub domain: Option<String>,
    pub status: Option<TestStatus>,
    pub allow_multiple_submissions: Option<bool>,
    #[serde(default)]
    pub questions: Vec<QuestionPayload>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTestPayload {
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "trim_optional_string")]
    pub duration: Option<String>,
    #[validate(length(min = 1, max = 128, message = "Password cannot be empty"))]
    pub password: Option<String>,
    pub status: Option<TestStatus>,
    pub allow_multiple_submissions: Option<bool>,
    pub questions: Option<Vec<QuestionPayload>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetStatusPayload {
    pub status: TestStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishLeaderboardPayload {
    pub published: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestDetail {
    #[serde(flatten)]
    pub test: Test,
    pub duration_minutes: i64,
    pub questions: Vec<Question>,
}

/// What a candidate sees in the test list.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateTestSummary {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration: String,
    pub duration_minutes: i64,
    pub domain: String,
    pub total_marks: i32,
    pub allow_multiple_submissions: bool,
    pub leaderboard_published: bool,
    pub attempted: bool,
    pub can_attempt: bool,
    pub in_progress_session: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
