use crate::{
    dto::test_dto::{
        CreateTestPayload, PublishLeaderboardPayload, SetStatusPayload, UpdateTestPayload,
    },
    error::{Error, Result},
    middleware::request_meta::RequestMeta,
    models::user::{Role, User},
    services::audit_service::AuditEntry,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;

#[axum::debug_handler]
pub async fn create_test(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Json(payload): Json<CreateTestPayload>,
) -> Result<impl IntoResponse> {
    let detail = state.test_service.create_test(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn list_tests(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
) -> Result<Response> {
    if actor.role() == Role::Candidate {
        let tests = state.test_service.list_for_candidate(&actor).await?;
        return Ok(Json(tests).into_response());
    }
    let tests = state.test_service.list_managed(&actor).await?;
    Ok(Json(tests).into_response())
}

pub async fn get_test(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Response> {
    if actor.role() == Role::Candidate {
        let summary = state
            .test_service
            .list_for_candidate(&actor)
            .await?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound("Test not found".to_string()))?;
        return Ok(Json(summary).into_response());
    }
    let detail = state.test_service.get_detail(&actor, id).await?;
    Ok(Json(detail).into_response())
}

#[axum::debug_handler]
pub async fn update_test(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTestPayload>,
) -> Result<impl IntoResponse> {
    let detail = state.test_service.update_test(&actor, id, payload).await?;
    Ok(Json(detail))
}

pub async fn set_status(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetStatusPayload>,
) -> Result<impl IntoResponse> {
    let test = state
        .test_service
        .set_status(&actor, id, payload.status)
        .await?;
    Ok(Json(test))
}

pub async fn publish_leaderboard(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PublishLeaderboardPayload>,
) -> Result<impl IntoResponse> {
    let test = state
        .test_service
        .set_leaderboard_published(&actor, id, payload.published)
        .await?;
    Ok(Json(test))
}

pub async fn delete_test(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let test = state.test_service.get_managed_test(&actor, id).await?;
    state.test_service.delete_test(&actor, id).await?;
    state
        .audit_service
        .record(
            &meta,
            AuditEntry {
                user_id: Some(actor.id),
                action: "delete",
                entity_type: "test",
                entity_id: id,
                changes: Some(json!({ "title": test.title, "domain": test.domain })),
            },
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}
