//! Cookie helpers
//!
//! Minimal `Cookie` header parsing and `Set-Cookie` value construction for the
//! session and flash cookies.

use axum::http::{header::COOKIE, HeaderMap};

/// Name of the cookie holding the signed session token
pub const SESSION_COOKIE: &str = "sessionid";

/// Name of the cookie carrying the one-shot status message
pub const FLASH_COOKIE: &str = "flash";

/// Returns the value of cookie `name` from the request headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// `Set-Cookie` value for an HttpOnly, same-site cookie scoped to the whole site
pub fn build_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes cookie `name`
pub fn expire_cookie(name: &str) -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        name
    )
}
