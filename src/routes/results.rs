use crate::{
    dto::grading_dto::GradePayload,
    error::{Error, Result},
    middleware::request_meta::RequestMeta,
    models::user::{Role, User},
    services::audit_service::AuditEntry,
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;

pub async fn list_test_results(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let results = state.grading_service.list_results(&actor, test_id).await?;
    Ok(Json(results))
}

/// A candidate's own history. Managers list results per test instead.
pub async fn list_my_results(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
) -> Result<impl IntoResponse> {
    if actor.role() != Role::Candidate {
        return Err(Error::Forbidden(
            "Results are listed per test for heads and admins".to_string(),
        ));
    }
    let results = state.grading_service.list_own(&actor).await?;
    Ok(Json(results))
}

pub async fn get_result(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let result = state.grading_service.get_result(&actor, id).await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn grade_result(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    Json(payload): Json<GradePayload>,
) -> Result<impl IntoResponse> {
    let changes = json!({
        "question_marks": payload.question_marks,
        "finalize": payload.finalize,
    });
    let result = state.grading_service.grade(&actor, id, payload).await?;
    state
        .audit_service
        .record(
            &meta,
            AuditEntry {
                user_id: Some(actor.id),
                action: "grade",
                entity_type: "result",
                entity_id: result.id,
                changes: Some(changes),
            },
        )
        .await;
    Ok(Json(result))
}

pub async fn delete_result(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let deleted = state.grading_service.delete_result(&actor, id).await?;
    state
        .audit_service
        .record(
            &meta,
            AuditEntry {
                user_id: Some(actor.id),
                action: "delete",
                entity_type: "result",
                entity_id: id,
                changes: Some(json!({
                    "candidate_id": deleted.candidate_id,
                    "test_id": deleted.test_id,
                    "status": deleted.status,
                })),
            },
        )
        .await;
    Ok(StatusCode::NO_CONTENT)
}
