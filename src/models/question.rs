use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub test_id: Uuid,
    pub position: i32,
    pub text: String,
    pub question_type: String,
    pub options: Json<Vec<String>>,
    pub correct_answer: Option<String>,
    pub marks: i32,
    pub image_url: Option<String>,
}

impl Question {
    pub fn kind(&self) -> Option<QuestionType> {
        match self.question_type.as_str() {
            "mcq" => Some(QuestionType::Mcq),
            "long" => Some(QuestionType::Long),
            "code" => Some(QuestionType::Code),
            _ => None,
        }
    }

    /// The shape served to a candidate during a session.
    pub fn for_candidate(&self) -> CandidateQuestion {
        CandidateQuestion {
            id: self.id,
            position: self.position,
            text: self.text.clone(),
            question_type: self.question_type.clone(),
            options: self.options.0.clone(),
            marks: self.marks,
            image_url: self.image_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Mcq,
    Long,
    Code,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::Long => "long",
            QuestionType::Code => "code",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateQuestion {
    pub id: Uuid,
    pub position: i32,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub options: Vec<String>,
    pub marks: i32,
    pub image_url: Option<String>,
}
