//! User management service
//!
//! All user-related business logic lives here.
//! HTTP handlers should be thin wrappers that delegate to this service.

use std::sync::Arc;

use tracing::info;

use crate::auth::jwt::{create_token, JwtConfig};
use crate::auth::password::{hash_password, verify_password};
use crate::domain::{
    CreateUserDto, DomainError, GetUserDto, UpdateUserDto, User, UserRepositoryInterface,
};
use crate::shared::{DomainResult, PaginatedResult};

/// Authentication result returned after a successful login
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// Orchestrates identity and user-management use-cases.
///
/// Generic over `R: UserRepositoryInterface` so it stays decoupled from
/// the concrete persistence layer.
pub struct UserService<R: UserRepositoryInterface> {
    repo: Arc<R>,
    jwt_config: JwtConfig,
}

impl<R: UserRepositoryInterface> UserService<R> {
    pub fn new(repo: Arc<R>, jwt_config: JwtConfig) -> Self {
        Self { repo, jwt_config }
    }

    // ── Authentication ──────────────────────────────────────────

    /// Authenticate user by username/email + password and return a JWT.
    pub async fn login(&self, username_or_email: &str, password: &str) -> DomainResult<AuthResult> {
        // Try username first, then email
        let user = self
            .repo
            .get_user_by_username(username_or_email)
            .await?
            .or(self.repo.get_user_by_email(username_or_email).await?);

        let Some(user) = user else {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        };

        if !user.is_active {
            return Err(DomainError::Unauthorized("Account is deactivated".into()));
        }

        let valid = verify_password(password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Unauthorized("Invalid credentials".into()));
        }

        let token = create_token(&user.id, &user.username, &user.role, &self.jwt_config)
            .map_err(|e| DomainError::Validation(format!("Failed to create token: {}", e)))?;

        self.repo.record_login(&user.id).await?;

        Ok(AuthResult {
            token,
            token_type: "Bearer".into(),
            expires_in: self.jwt_config.expiration_hours * 3600,
            user,
        })
    }

    // ── Registration ────────────────────────────────────────────

    /// Register a new user. Without an explicit role the account is a
    /// patient account.
    pub async fn register(&self, dto: CreateUserDto) -> DomainResult<User> {
        // Validation
        if dto.username.len() < 3 || dto.username.len() > 50 {
            return Err(DomainError::Validation(
                "Username must be 3-50 characters".into(),
            ));
        }
        if dto.password.len() < 8 {
            return Err(DomainError::Validation(
                "Password must be at least 8 characters".into(),
            ));
        }
        if !dto.email.contains('@') {
            return Err(DomainError::Validation("Invalid email address".into()));
        }

        // Check uniqueness
        if self.repo.get_user_by_username(&dto.username).await?.is_some() {
            return Err(DomainError::Conflict("Username already exists".into()));
        }
        if self.repo.get_user_by_email(&dto.email).await?.is_some() {
            return Err(DomainError::Conflict("Email already exists".into()));
        }

        let username = dto.username.clone();
        self.repo.create_user(dto).await?;

        // Fetch the newly created user
        let user = self
            .repo
            .get_user_by_username(&username)
            .await?
            .ok_or_else(|| {
                DomainError::Validation("User created but could not be retrieved".into())
            })?;

        info!(user_id = %user.id, username = %user.username, role = %user.role, "New user registered");
        Ok(user)
    }

    // ── Queries ─────────────────────────────────────────────────

    /// List users with search, filtering and pagination.
    pub async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        self.repo.list_users(dto).await
    }

    /// Get a single user by ID.
    pub async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        self.repo.get_user_by_id(id).await
    }

    /// Get user by username.
    pub async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        self.repo.get_user_by_username(username).await
    }

    // ── Commands (mutations) ────────────────────────────────────

    /// Update user profile fields (username, email, role).
    pub async fn update_user(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        self.repo.update_user(id, dto).await
    }

    /// Change a user's password. Verifies the current password first.
    ///
    /// Bumping `password_changed_at` revokes every token issued before
    /// this call.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> DomainResult<()> {
        if new_password.len() < 8 {
            return Err(DomainError::Validation(
                "New password must be at least 8 characters".into(),
            ));
        }

        let user = self
            .repo
            .get_user_by_id(user_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity: "User",
                field: "id",
                value: user_id.to_string(),
            })?;

        let valid = verify_password(current_password, &user.password_hash).unwrap_or(false);
        if !valid {
            return Err(DomainError::Unauthorized("Invalid current password".into()));
        }

        let new_hash = hash_password(new_password)
            .map_err(|e| DomainError::Validation(format!("Failed to hash password: {}", e)))?;

        self.repo.update_user_password(user_id, &new_hash).await?;

        info!(user_id, "Password changed");
        Ok(())
    }

    /// Deactivate a user account. Accounts are never deleted so their
    /// audit trail stays intact.
    pub async fn deactivate_user(&self, id: &str) -> DomainResult<()> {
        self.repo.set_user_active(id, false).await?;
        info!(user_id = id, "User deactivated");
        Ok(())
    }

    /// Reactivate a previously deactivated account.
    pub async fn reactivate_user(&self, id: &str) -> DomainResult<()> {
        self.repo.set_user_active(id, true).await?;
        info!(user_id = id, "User reactivated");
        Ok(())
    }
}
