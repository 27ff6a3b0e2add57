//! User DTOs passed between the HTTP layer, services and repositories.

use super::UserRole;

/// Create user input
#[derive(Debug, Clone)]
pub struct CreateUserDto {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Defaults to `Patient` when absent.
    pub role: Option<UserRole>,
}

/// User list query input
#[derive(Debug, Clone, Default)]
pub struct GetUserDto {
    /// Matches against username or email.
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub include_inactive: bool,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Update user input; `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateUserDto {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
}
