use crate::{error::Result, models::user::User, AppState};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

pub async fn get_leaderboard(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
    Path(test_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let board = state
        .leaderboard_service
        .leaderboard(&actor, test_id)
        .await?;
    Ok(Json(board))
}
