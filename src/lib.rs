//! # CareFlow HMS
//!
//! Hospital management REST backend: patients, appointments,
//! prescriptions, lab tests, billing and pharmacy inventory.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Core business entities, types and repository traits
//! - **application**: Business logic (identity service, audit recorder)
//! - **infrastructure**: External concerns (SeaORM entities, migrations, repositories)
//! - **interfaces**: REST API with Swagger documentation
//! - **auth**: JWT authentication, session cookie and role gates

pub mod application;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::database::{init_database, DatabaseConfig};

// Re-export API router
pub use interfaces::http::create_api_router;
