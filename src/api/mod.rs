//! API Layer
//!
//! HTML pages and form handling for the account service.

pub mod auth_handlers;
pub mod cookies;
pub mod flash;
pub mod handlers;
pub mod middleware;
pub mod pages;
pub mod routes;

// Re-export commonly used types
pub use flash::{FlashLevel, FlashMessage, IncomingFlash};
pub use handlers::AppState;
pub use middleware::{require_login, session_middleware, CurrentUser, MaybeUser};
pub use pages::{Page, PageTemplates};
pub use routes::{create_app, create_app_with, RouterBuilder};
