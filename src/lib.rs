pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::services::{
    audit_service::AuditService,
    auth_service::AuthService,
    dashboard_service::DashboardService,
    grading_service::GradingService,
    leaderboard_service::LeaderboardService,
    monitoring_service::MonitoringService,
    session_service::{SessionPolicy, SessionService},
    test_service::TestService,
    user_service::UserService,
};
use sqlx::PgPool;

pub use crate::routes::build_router;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub test_service: TestService,
    pub session_service: SessionService,
    pub grading_service: GradingService,
    pub leaderboard_service: LeaderboardService,
    pub monitoring_service: MonitoringService,
    pub dashboard_service: DashboardService,
    pub audit_service: AuditService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        Self {
            auth_service: AuthService::new(pool.clone()),
            user_service: UserService::new(pool.clone()),
            test_service: TestService::new(pool.clone()),
            session_service: SessionService::new(pool.clone(), SessionPolicy::from_config(config)),
            grading_service: GradingService::new(pool.clone()),
            leaderboard_service: LeaderboardService::new(pool.clone()),
            monitoring_service: MonitoringService::new(pool.clone()),
            dashboard_service: DashboardService::new(pool.clone()),
            audit_service: AuditService::new(pool.clone()),
            pool,
        }
    }
}
