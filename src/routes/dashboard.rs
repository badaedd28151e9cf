use crate::{error::Result, models::user::User, AppState};
use axum::{extract::State, response::IntoResponse, Extension, Json};

pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(actor): Extension<User>,
) -> Result<impl IntoResponse> {
    let dashboard = state.dashboard_service.dashboard(&actor).await?;
    Ok(Json(dashboard))
}
