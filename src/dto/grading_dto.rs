use crate::models::result::{MarkMap, TestResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct GradePayload {
    #[serde(default)]
    pub question_marks: MarkMap,
    pub expected_revision: Option<i32>,
    #[serde(default)]
    pub finalize: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultWithCandidate {
    #[serde(flatten)]
    pub result: TestResult,
    pub candidate_name: String,
    pub candidate_email: String,
}
