//! Database Module
//!
//! Database connection management and schema migrations for the account service.

pub mod connection;

// Re-export commonly used types
pub use connection::{connect_in_memory, run_migrations, DatabaseConfig, DatabasePool};
