//! User aggregate
//!
//! Contains the User entity, DTOs, and repository interface.

pub mod model;
pub mod repository;

mod dto;

pub use dto::{CreateUserDto, GetUserDto, UpdateUserDto};
pub use model::{User, UserRole};
pub use repository::UserRepositoryInterface;
