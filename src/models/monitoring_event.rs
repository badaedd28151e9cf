use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MonitoringEvent {
    pub id: Uuid,
    pub result_id: Uuid,
    pub test_id: Uuid,
    pub candidate_id: Uuid,
    pub kind: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    TabSwitch,
    Paste,
    FocusReturn,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::TabSwitch => "tab_switch",
            EventKind::Paste => "paste",
            EventKind::FocusReturn => "focus_return",
        }
    }
}
