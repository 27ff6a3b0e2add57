//! HTTP API modules
//!
//! One sub-module per resource, each carrying its own handler state.

pub mod appointments;
pub mod audit;
pub mod auth;
pub mod health;
pub mod inventory;
pub mod invoices;
pub mod lab_tests;
pub mod patients;
pub mod prescriptions;
pub mod request_id;
pub mod users;

/// Audit recorder shared by every mutating handler.
pub type SharedAudit = std::sync::Arc<
    crate::application::AuditRecorder<crate::infrastructure::database::repositories::AuditLogRepository>,
>;
