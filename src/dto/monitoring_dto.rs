use serde::Deserialize;
use uuid::Uuid;

/// Filters for a test's monitoring log.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MonitoringQuery {
    pub candidate_id: Option<Uuid>,
}
