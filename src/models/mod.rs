pub mod audit_log;
pub mod monitoring_event;
pub mod question;
pub mod result;
pub mod user;
