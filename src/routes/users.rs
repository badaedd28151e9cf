use crate::{
    dto::user_dto::{ListUsersQuery, UpdateUserPayload},
    error::Result,
    middleware::request_meta::RequestMeta,
    models::user::User,
    services::audit_service::AuditEntry,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse> {
    let users = state.user_service.list_users(&actor, query).await?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    crate::services::user_service::require_admin(&actor)?;
    let user = state.user_service.get_user(id).await?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let changes = json!({
        "role": payload.role,
        "domain": payload.domain,
        "clear_domain": payload.clear_domain,
        "blocked": payload.blocked,
        "approved": payload.approved,
    });
    let user = state.user_service.update_user(&actor, id, payload).await?;
    state
        .audit_service
        .record(
            &meta,
            AuditEntry {
                user_id: Some(actor.id),
                action: "update",
                entity_type: "user",
                entity_id: user.id,
                changes: Some(changes),
            },
        )
        .await;
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.user_service.delete_user(&actor, id).await?;
    state
        .audit_service
        .record(
            &meta,
            AuditEntry {
                user_id: Some(actor.id),
                action: "delete",
                entity_type: "user",
                entity_id: id,
                changes: None,
            },
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}
