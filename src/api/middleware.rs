//! Session Middleware
//!
//! Resolves the session cookie into the current user and guards the pages that
//! require a login.

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::SET_COOKIE, request::Parts, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::cookies::{expire_cookie, read_cookie, SESSION_COOKIE};
use super::handlers::AppState;
use crate::service::AuthenticatedUser;
use crate::utils::security::SecurityHeaders;
use url::form_urlencoded;

/// Path of the login page unauthenticated visitors are sent to
pub const LOGIN_URL: &str = "/accounts/login/";

/// Extension holding the user whose session cookie was accepted
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthenticatedUser);

/// Outcome of checking a session cookie
enum SessionLookup {
    Anonymous,
    Valid(AuthenticatedUser),
    Rejected,
}

async fn resolve_session(state: &AppState, token: Option<String>) -> SessionLookup {
    let Some(token) = token else {
        return SessionLookup::Anonymous;
    };

    let claims = match state.session_service.decode(&token) {
        Ok(claims) => claims,
        Err(e) => {
            log::debug!("Rejected session cookie: {}", e);
            return SessionLookup::Rejected;
        }
    };

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(_) => return SessionLookup::Rejected,
    };

    let account = match state.user_service.session_user(user_id).await {
        Ok(Some(account)) => account,
        Ok(None) => return SessionLookup::Rejected,
        Err(e) => {
            log::error!("Failed to load session user {}: {}", user_id, e);
            return SessionLookup::Anonymous;
        }
    };

    match state.session_service.verify_current(&claims, &account) {
        Ok(()) => SessionLookup::Valid(account),
        Err(e) => {
            log::info!("Dropping session for user {}: {}", user_id, e);
            SessionLookup::Rejected
        }
    }
}

/// Session middleware
///
/// Attaches [`CurrentUser`] when the session cookie is valid for the stored
/// credential. Invalid, expired or stale cookies are removed from the browser
/// and the request continues anonymously.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = read_cookie(request.headers(), SESSION_COOKIE);
    let lookup = resolve_session(&state, token).await;

    let rejected = matches!(lookup, SessionLookup::Rejected);
    if let SessionLookup::Valid(account) = lookup {
        request.extensions_mut().insert(CurrentUser(account));
    }

    let mut response = next.run(request).await;

    if rejected {
        if let Ok(value) = HeaderValue::from_str(&expire_cookie(SESSION_COOKIE)) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}

/// Login URL that returns the visitor to `path` afterwards
pub fn login_redirect_url(path_and_query: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("next", path_and_query)
        .finish();
    format!("{}?{}", LOGIN_URL, query)
}

/// Login guard
///
/// Must run after [`session_middleware`]. Requests without a current user are
/// redirected to the login page before the handler runs.
pub async fn require_login(request: Request, next: Next) -> Response {
    if request.extensions().get::<CurrentUser>().is_some() {
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    log::debug!("Anonymous request to {} redirected to login", target);
    Redirect::to(&login_redirect_url(&target)).into_response()
}

/// Adds the standard security headers to every response
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    for (name, value) in SecurityHeaders::standard() {
        headers.insert(name, HeaderValue::from_static(value));
    }

    response
}

/// The current user when the request carries a valid session
#[derive(Debug, Clone, Default)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(
            parts
                .extensions
                .get::<CurrentUser>()
                .map(|current| current.0.clone()),
        ))
    }
}
