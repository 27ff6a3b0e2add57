//! Audit trail aggregate

pub mod model;
pub mod repository;

pub use model::{AuditRecord, GetAuditDto, NewAuditRecord};
pub use repository::AuditRepositoryInterface;
