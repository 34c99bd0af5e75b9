//! Account Service Library
//!
//! Server-rendered account management: a public user directory, profile view
//! and edit, password change and email change, behind a cookie session.
//!
//! # Features
//!
//! - **One profile per user**: every write that touches a user also provisions
//!   its profile inside the same transaction
//! - **Form validation**: field-level error messages for every page form
//! - **Session continuity**: a password change re-issues the caller's session
//!   while older sessions become stale
//! - **Activity logging**: one line per submission with credentials masked
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use account_service::{
//!     api::{create_app, AppState, PageTemplates},
//!     database::{run_migrations, DatabaseConfig},
//!     service::{SessionService, UserService},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = DatabaseConfig::from_env().create_pool().await?;
//!     run_migrations(&pool).await?;
//!
//!     let state = AppState::new(
//!         UserService::new(pool),
//!         SessionService::new("a-session-secret-of-at-least-32-chars".to_string()),
//!         PageTemplates::new()?,
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, create_app(state)).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **API Layer**: page handlers, session middleware and routing
//! - **Forms**: validation of submitted fields into change sets
//! - **Service Layer**: account persistence, session tokens, activity log
//! - **Models**: user and profile records
//! - **Database**: SQLite pool and embedded migrations

/// HTML pages, session middleware and routing
pub mod api;

/// Configuration loaded from the environment
pub mod config;

/// Database connection management and migrations
pub mod database;

/// Submitted form validation
pub mod forms;

/// User and profile records
pub mod models;

/// Account, session and activity services
pub mod service;

/// Shared utilities for security, validation, logging and error handling
pub mod utils;

// Re-export commonly used types for convenient access
pub use api::{create_app, AppState, RouterBuilder};
pub use models::{NewUser, Profile, ProfileChanges, User, UserChanges};
pub use service::{ActivityLog, SessionService, UserService};
pub use utils::error::{AppError, AppResult, ErrorResponse};

// Re-export database utilities for configuration
pub use database::{DatabaseConfig, DatabasePool};

// Re-export configuration system
pub use config::{env, AppConfig, LoggingConfig, ServerConfig, SessionConfig};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
