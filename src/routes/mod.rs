pub mod audit;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod leaderboard;
pub mod monitoring;
pub mod results;
pub mod sessions;
pub mod tests;
pub mod users;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::middleware::{auth::require_auth, cors::permissive_cors, rate_limit};
use crate::AppState;

const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn build_router(state: AppState, api_rps: u32) -> Router {
    let base_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready));

    let public_api = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/verify-email", post(auth::verify_email))
        .route("/api/auth/login", post(auth::login));

    let protected_api = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/dashboard", get(dashboard::get_dashboard))
        .route("/api/audit-logs", get(audit::list_audit_logs))
        .route("/api/users", get(users::list_users))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/api/tests",
            get(tests::list_tests).post(tests::create_test),
        )
        .route(
            "/api/tests/:id",
            get(tests::get_test)
                .patch(tests::update_test)
                .delete(tests::delete_test),
        )
        .route("/api/tests/:id/status", put(tests::set_status))
        .route(
            "/api/tests/:id/leaderboard/publish",
            put(tests::publish_leaderboard),
        )
        .route("/api/tests/:id/leaderboard", get(leaderboard::get_leaderboard))
        .route("/api/tests/:id/results", get(results::list_test_results))
        .route("/api/tests/:id/monitoring", get(monitoring::list_events))
        .route("/api/tests/:id/sessions", post(sessions::start_session))
        .route("/api/sessions/:id", get(sessions::get_session))
        .route("/api/sessions/:id/answers", put(sessions::save_answer))
        .route("/api/sessions/:id/events", post(sessions::record_event))
        .route("/api/sessions/:id/submit", post(sessions::submit_session))
        .route("/api/results/mine", get(results::list_my_results))
        .route(
            "/api/results/:id",
            get(results::get_result).delete(results::delete_result),
        )
        .route("/api/results/:id/grade", post(results::grade_result))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let api = public_api
        .merge(protected_api)
        .layer(from_fn_with_state(
            rate_limit::RateLimiter::new(api_rps),
            rate_limit::rps_middleware,
        ));

    base_routes
        .merge(api)
        .with_state(state)
        .layer(permissive_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
