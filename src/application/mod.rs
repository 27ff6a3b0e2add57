//! Application layer: use-case orchestration over the domain

pub mod audit;
pub mod identity;

pub use audit::{AuditRecorder, RequestMeta};
pub use identity::{AuthResult, UserService};
