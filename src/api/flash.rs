//! Flash messages
//!
//! A status message set by one response and displayed by the next page
//! render, carried in a short-lived cookie as base64-encoded JSON.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

use super::cookies::{build_cookie, expire_cookie, read_cookie, FLASH_COOKIE};

/// Flash cookies only need to survive one redirect
const FLASH_MAX_AGE_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

impl FlashMessage {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }

    pub fn encode(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decodes a cookie value, ignoring anything malformed
    pub fn decode(value: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// `Set-Cookie` value carrying this message to the next request
    pub fn to_cookie(&self, secure: bool) -> String {
        build_cookie(FLASH_COOKIE, &self.encode(), FLASH_MAX_AGE_SECS, secure)
    }

    /// `Set-Cookie` value that consumes a displayed message
    pub fn clear_cookie() -> String {
        expire_cookie(FLASH_COOKIE)
    }
}

/// The flash message delivered with the current request, if any
#[derive(Debug, Clone, Default)]
pub struct IncomingFlash(pub Option<FlashMessage>);

impl<S> FromRequestParts<S> for IncomingFlash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(IncomingFlash(
            read_cookie(&parts.headers, FLASH_COOKIE).and_then(|value| FlashMessage::decode(&value)),
        ))
    }
}
