//! Configuration Module
//!
//! Centralized configuration for the account service: HTTP server, database,
//! sessions, password hashing and logging. Values come from the environment
//! (optionally seeded from a `.env` file by the binaries).

use crate::database::DatabaseConfig;
use crate::utils::security::DEFAULT_BCRYPT_COST;

/// Environment variable helpers
pub mod env {
    use std::env;

    /// Get environment variable as string with default
    pub fn get_string(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get optional environment variable, treating empty values as unset
    pub fn get_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    /// Get environment variable as boolean with default
    pub fn get_bool(key: &str, default: bool) -> bool {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u32 with default
    pub fn get_u32(key: &str, default: u32) -> u32 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u16 with default
    pub fn get_u16(key: &str, default: u16) -> u16 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u64 with default
    pub fn get_u64(key: &str, default: u64) -> u64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as i64 with default
    pub fn get_i64(key: &str, default: i64) -> i64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Check if environment variable is set
    pub fn is_set(key: &str) -> bool {
        env::var(key).is_ok()
    }
}

/// Application configuration combining all service configurations
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,

    /// bcrypt cost used for new password hashes
    pub bcrypt_cost: u32,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Session cookie and token configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC secret used to sign session tokens
    pub secret: String,
    /// Session lifetime in hours (two weeks by default)
    pub ttl_hours: i64,
    /// Mark cookies `Secure` (HTTPS only)
    pub cookie_secure: bool,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter, e.g. `info` or `account_service=debug`
    pub level: String,
    /// Log file that records are appended to, next to stderr output
    pub file: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: env::get_string("SERVER_HOST", "0.0.0.0"),
            port: env::get_u16("SERVER_PORT", 8000),
        }
    }
}

impl SessionConfig {
    /// Minimum accepted length of the signing secret
    pub const MIN_SECRET_LENGTH: usize = 32;

    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let secret = env::get_optional("SESSION_SECRET")
            .ok_or("Required environment variable SESSION_SECRET is not set")?;

        Ok(Self {
            secret,
            ttl_hours: env::get_i64("SESSION_TTL_HOURS", 24 * 14),
            cookie_secure: env::get_bool("SESSION_COOKIE_SECURE", false),
        })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        let file = if env::is_set("LOG_FILE") {
            env::get_optional("LOG_FILE")
        } else {
            Some("account_service.log".to_string())
        };

        Self {
            level: env::get_string("LOG_LEVEL", "info"),
            file,
        }
    }
}

impl AppConfig {
    /// Load complete application configuration from environment
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::from_env(),
            session: SessionConfig::from_env()?,
            logging: LoggingConfig::default(),
            bcrypt_cost: env::get_u32("BCRYPT_COST", DEFAULT_BCRYPT_COST),
        })
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".into());
        }

        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".into());
        }

        if self.database.min_connections > self.database.max_connections {
            return Err("Database min_connections cannot be greater than max_connections".into());
        }

        if self.session.secret.len() < SessionConfig::MIN_SECRET_LENGTH {
            return Err(format!(
                "SESSION_SECRET must be at least {} characters",
                SessionConfig::MIN_SECRET_LENGTH
            )
            .into());
        }

        if self.session.ttl_hours <= 0 {
            return Err("SESSION_TTL_HOURS must be greater than 0".into());
        }

        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err("BCRYPT_COST must be between 4 and 31".into());
        }

        Ok(())
    }
}
