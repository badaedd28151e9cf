use crate::models::monitoring_event::EventKind;
use crate::models::question::CandidateQuestion;
use crate::models::result::AnswerMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartSessionPayload {
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub test_id: Uuid,
    pub title: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub deadline_at: DateTime<Utc>,
    pub remaining_seconds: i64,
    pub tab_switches: i32,
    pub tab_switch_limit: i32,
    pub questions: Vec<CandidateQuestion>,
    pub answers: AnswerMap,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveAnswerPayload {
    pub question_id: Uuid,
    #[validate(length(max = 100000, message = "Answer is too long"))]
    pub answer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveAnswerResponse {
    pub saved: bool,
    pub question_id: Uuid,
    pub remaining_seconds: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RecordEventPayload {
    pub kind: EventKind,
    /// Stored verbatim; longer pastes are refused rather than cut.
    #[validate(length(max = 20000, message = "Event content is too long"))]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordEventResponse {
    pub tab_switches: i32,
    pub remaining_switches: i32,
    pub terminated: bool,
    pub status: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitSessionPayload {
    #[serde(default)]
    pub answers: Option<AnswerMap>,
    /// Set by the client when its countdown reached zero.
    #[serde(default)]
    pub auto: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitSessionResponse {
    pub result_id: Uuid,
    pub status: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paste(len: usize) -> RecordEventPayload {
        RecordEventPayload {
            kind: EventKind::Paste,
            content: Some("x".repeat(len)),
        }
    }

    #[test]
    fn paste_content_up_to_the_limit_is_accepted() {
        assert!(paste(20_000).validate().is_ok());
        assert!(RecordEventPayload {
            kind: EventKind::TabSwitch,
            content: None
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn oversized_paste_content_is_rejected() {
        assert!(paste(20_001).validate().is_err());
    }
}
