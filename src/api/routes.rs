//! Route Definitions
//!
//! Maps every page to its handlers. The `RouterBuilder` lets a deployment
//! leave out the public account pages (login, signup, user list) when those
//! are served elsewhere.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::auth_handlers::*;
use super::handlers::*;
use super::middleware::{require_login, security_headers_middleware, session_middleware};

/// Builder for the page router
///
/// Routes that need a login are always mounted behind [`require_login`]; the
/// flags only control which public pages are exposed.
pub struct RouterBuilder {
    /// Landing page (GET /)
    home: bool,
    /// Public user directory (GET /users/)
    user_list: bool,
    /// Login, logout and signup pages under /accounts/
    accounts: bool,
    /// Health check endpoint (GET /health)
    health_check: bool,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::with_all_routes()
    }
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_all_routes() -> Self {
        Self {
            home: true,
            user_list: true,
            accounts: true,
            health_check: true,
        }
    }

    /// Only the logged-in account pages
    pub fn with_account_pages_only() -> Self {
        Self {
            home: false,
            user_list: false,
            accounts: false,
            health_check: false,
        }
    }

    pub fn home(mut self, enabled: bool) -> Self {
        self.home = enabled;
        self
    }

    pub fn user_list(mut self, enabled: bool) -> Self {
        self.user_list = enabled;
        self
    }

    pub fn accounts(mut self, enabled: bool) -> Self {
        self.accounts = enabled;
        self
    }

    pub fn health_check(mut self, enabled: bool) -> Self {
        self.health_check = enabled;
        self
    }

    /// Builds the routes without session handling; see [`create_app`]
    pub fn build(self) -> Router<AppState> {
        let protected = Router::new()
            .route("/profile/", get(profile))
            .route("/profile/edit/", get(edit_profile_form).post(edit_profile_submit))
            .route("/change-password/", get(change_password_form).post(change_password_submit))
            .route("/change-email/", get(change_email_form).post(change_email_submit))
            .route_layer(middleware::from_fn(require_login));

        let mut router = Router::new().merge(protected);

        if self.home {
            router = router.route("/", get(home));
        }

        if self.user_list {
            router = router.route("/users/", get(user_list));
        }

        if self.accounts {
            router = router
                .route("/accounts/login/", get(login_form).post(login_submit))
                .route("/accounts/logout/", post(logout))
                .route("/accounts/signup/", get(signup_form).post(signup_submit));
        }

        if self.health_check {
            router = router.route("/health", get(health_check));
        }

        router
    }
}

/// Full application: routes, session resolution, security headers and request tracing
pub fn create_app(state: AppState) -> Router {
    create_app_with(RouterBuilder::with_all_routes(), state)
}

pub fn create_app_with(builder: RouterBuilder, state: AppState) -> Router {
    builder
        .build()
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_builder_presets() {
        let all = RouterBuilder::with_all_routes();
        assert!(all.home && all.user_list && all.accounts && all.health_check);

        let minimal = RouterBuilder::with_account_pages_only();
        assert!(!minimal.home && !minimal.user_list && !minimal.accounts && !minimal.health_check);
    }

    #[test]
    fn test_router_builder_toggles() {
        let builder = RouterBuilder::with_account_pages_only()
            .health_check(true)
            .accounts(true);

        assert!(builder.health_check);
        assert!(builder.accounts);
        assert!(!builder.home);
        assert!(!builder.user_list);

        let _router: Router<AppState> = builder.build();
    }
}
