pub mod dto;
pub mod handlers;

pub use dto::{AuditRecordDto, ListAuditParams};
pub use handlers::{list_audit_logs, AuditHandlerState};
