//! Utilities Module
//!
//! Shared utilities for error handling, logging, security and validation
//! used throughout the account service.

pub mod error;
pub mod logging;
pub mod security;
pub mod validation;

// Re-export commonly used utilities
pub use error::{AppError, AppResult, ErrorResponse};
pub use security::*;
pub use validation::*;
