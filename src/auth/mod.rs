//! Authentication and Authorization module
//!
//! Provides JWT token-based authentication with cookie or bearer
//! transport, plus role gating for route groups.

pub mod cookie;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use cookie::{create_auth_cookie, create_logout_cookie, AUTH_COOKIE_NAME};
pub use jwt::{create_token, verify_token, AuthError, Claims, JwtConfig};
pub use middleware::{auth_middleware, require_role, AuthState, AuthenticatedUser};
pub use password::{hash_password, verify_password};
