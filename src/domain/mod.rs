//! Core business entities, DTOs and repository interfaces.

pub mod audit;
pub mod user;

pub use audit::{AuditRecord, AuditRepositoryInterface, GetAuditDto, NewAuditRecord};
pub use user::{
    CreateUserDto, GetUserDto, UpdateUserDto, User, UserRepositoryInterface, UserRole,
};

// Re-export error types for convenience
pub use crate::shared::{DomainError, DomainResult};
