use crate::{dto::monitoring_dto::MonitoringQuery, error::Result, models::user::User, AppState};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

pub async fn list_events(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(test_id): Path<Uuid>,
    Query(query): Query<MonitoringQuery>,
) -> Result<impl IntoResponse> {
    let events = state
        .monitoring_service
        .list_events(&actor, test_id, query.candidate_id)
        .await?;
    Ok(Json(events))
}
