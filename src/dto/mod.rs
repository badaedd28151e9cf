pub mod audit_dto;
pub mod auth_dto;
pub mod grading_dto;
pub mod monitoring_dto;
pub mod session_dto;
pub mod test_dto;
pub mod user_dto;
