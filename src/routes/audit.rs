use crate::{
    dto::audit_dto::AuditLogQuery, error::Result, models::user::User,
    services::user_service::require_admin, AppState,
};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Extension, Json,
};

pub async fn list_audit_logs(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Query(query): Query<AuditLogQuery>,
) -> Result<impl IntoResponse> {
    require_admin(&actor)?;
    let logs = state
        .audit_service
        .list_for_entity(query.entity_type.trim(), query.entity_id)
        .await?;
    Ok(Json(logs))
}
