pub mod audit_service;
pub mod auth_service;
pub mod dashboard_service;
pub mod grading_service;
pub mod leaderboard_service;
pub mod monitoring_service;
pub mod session_service;
pub mod test_service;
pub mod user_service;
