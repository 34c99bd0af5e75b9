//! Service Layer
//!
//! Business logic and data access for accounts, sessions and activity logging.

pub mod activity_log;
pub mod session;
pub mod user;

// Re-export services
pub use activity_log::ActivityLog;
pub use session::{SessionError, SessionService};
pub use user::{AuthenticatedUser, UserService, UserServiceError, UserServiceResult};
