use crate::{
    config::get_config,
    dto::auth_dto::{LoginPayload, RegisterPayload, VerifyEmailPayload},
    error::Result,
    models::user::User,
    AppState,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use validator::Validate;

#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let response = state.auth_service.register(payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user = state
        .auth_service
        .verify_email(&payload.email, payload.token.trim())
        .await?;
    Ok(Json(user))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let response = state.auth_service.login(&payload, get_config()).await?;
    Ok(Json(response))
}

pub async fn me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}
