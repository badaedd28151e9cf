use crate::{
    dto::session_dto::{
        RecordEventPayload, SaveAnswerPayload, StartSessionPayload, SubmitSessionPayload,
        SubmitSessionResponse,
    },
    error::{Error, Result},
    models::result::ResultStatus,
    models::user::{Role, User},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

fn require_candidate(user: &User) -> Result<()> {
    if user.role() == Role::Candidate {
        Ok(())
    } else {
        Err(Error::Forbidden("Only candidates can take tests".to_string()))
    }
}

#[axum::debug_handler]
pub async fn start_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<StartSessionPayload>,
) -> Result<impl IntoResponse> {
    require_candidate(&user)?;
    payload.validate()?;
    let view = state
        .session_service
        .start(&user, test_id, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    require_candidate(&user)?;
    let view = state.session_service.view(&user, session_id).await?;
    Ok(Json(view))
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SaveAnswerPayload>,
) -> Result<impl IntoResponse> {
    require_candidate(&user)?;
    payload.validate()?;
    let saved = state
        .session_service
        .save_answer(&user, session_id, payload.question_id, payload.answer)
        .await?;
    Ok(Json(saved))
}

pub async fn record_event(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<RecordEventPayload>,
) -> Result<impl IntoResponse> {
    require_candidate(&user)?;
    payload.validate()?;
    let outcome = state
        .session_service
        .record_event(&user, session_id, payload.kind, payload.content)
        .await?;
    Ok(Json(outcome))
}

#[axum::debug_handler]
pub async fn submit_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<SubmitSessionPayload>,
) -> Result<impl IntoResponse> {
    require_candidate(&user)?;
    let result = state
        .session_service
        .submit(&user, session_id, payload)
        .await?;
    let message = match result.status() {
        ResultStatus::AutoSubmitted => "Time is up. Your answers were submitted automatically.",
        _ => "Your answers were submitted.",
    };
    Ok(Json(SubmitSessionResponse {
        result_id: result.id,
        status: result.status,
        submitted_at: result.submitted_at,
        message: message.to_string(),
    }))
}
