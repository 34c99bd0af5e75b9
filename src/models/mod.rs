//! Data Models Module
//!
//! Account and profile records plus the validated change sets applied to them.

pub mod user;

// Re-export commonly used types
pub use user::*;
