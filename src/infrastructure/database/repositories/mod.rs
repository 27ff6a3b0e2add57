pub mod audit_log_repository;
pub mod user_repository;

pub use audit_log_repository::AuditLogRepository;
pub use user_repository::UserRepository;
