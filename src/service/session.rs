//! Session Service
//!
//! Issues and validates the signed tokens kept in the session cookie. Each
//! token embeds the session-auth hash of the credential it was issued for;
//! once the password changes, older tokens no longer match and are rejected,
//! while the session that performed the change receives a fresh token.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::service::user::AuthenticatedUser;
use crate::utils::security::constant_time_compare;

/// Session token errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to issue session token: {0}")]
    TokenGeneration(String),

    #[error("Invalid session token: {0}")]
    InvalidToken(String),

    /// The credential changed after the token was issued
    #[error("Session is no longer valid for this account")]
    Stale,
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - user ID
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Unique token identifier
    pub jti: String,

    /// Session-auth hash of the credential at issue time
    pub auth_hash: String,
}

impl SessionClaims {
    pub fn new(
        user_id: Uuid,
        auth_hash: &str,
        expires_at: DateTime<Utc>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            auth_hash: auth_hash.to_string(),
        }
    }

    pub fn user_id(&self) -> SessionResult<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| SessionError::InvalidToken("Invalid user ID in token".into()))
    }
}

/// Session token service
#[derive(Clone)]
pub struct SessionService {
    secret: String,
    ttl: Duration,
}

impl SessionService {
    /// Create a new session service with the default two-week lifetime
    pub fn new(secret: String) -> Self {
        Self {
            secret,
            ttl: Duration::days(14),
        }
    }

    /// Create a session service from configuration
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            ttl: Duration::hours(config.ttl_hours),
        }
    }

    /// Session lifetime, also used as the cookie max-age
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for the user's current credential
    pub fn issue(&self, account: &AuthenticatedUser) -> SessionResult<String> {
        let now = Utc::now();
        let claims = SessionClaims::new(account.user.id, &account.auth_hash, now + self.ttl, now);
        self.encode_claims(&claims)
    }

    /// Decode a token without checking it against stored state
    pub fn decode(&self, token: &str) -> SessionResult<SessionClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let decoding_key = DecodingKey::from_secret(self.secret.as_ref());

        decode::<SessionClaims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| SessionError::InvalidToken(e.to_string()))
    }

    /// Checks that the token's auth hash still matches the stored credential
    pub fn verify_current(
        &self,
        claims: &SessionClaims,
        account: &AuthenticatedUser,
    ) -> SessionResult<()> {
        if claims.user_id()? != account.user.id {
            return Err(SessionError::InvalidToken("Token subject mismatch".into()));
        }

        if !constant_time_compare(&claims.auth_hash, &account.auth_hash) {
            return Err(SessionError::Stale);
        }

        Ok(())
    }

    fn encode_claims(&self, claims: &SessionClaims) -> SessionResult<String> {
        let header = Header::new(Algorithm::HS256);
        let encoding_key = EncodingKey::from_secret(self.secret.as_ref());

        encode(&header, claims, &encoding_key)
            .map_err(|e| SessionError::TokenGeneration(e.to_string()))
    }
}
