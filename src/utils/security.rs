//! Security Utilities
//!
//! Password hashing, session-auth hashing and security response headers.

use bcrypt::{hash, verify, DEFAULT_COST};

/// Default bcrypt cost for password hashing
pub const DEFAULT_BCRYPT_COST: u32 = DEFAULT_COST;

/// bcrypt only reads this many bytes of a password; anything past it is ignored
pub const BCRYPT_MAX_PASSWORD_BYTES: usize = 72;

/// Whether every byte of the password takes part in the bcrypt hash
pub fn fits_bcrypt_input(password: &str) -> bool {
    password.len() <= BCRYPT_MAX_PASSWORD_BYTES
}

/// Hash a password with custom bcrypt cost
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

/// Verify a password against its hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

/// Create a secure hash of sensitive data for storage or comparison
pub fn hash_sensitive_data(data: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Digest of a credential hash embedded in session tokens.
///
/// Changes whenever the password hash changes, which invalidates sessions
/// issued before a credential rotation.
pub fn session_auth_hash(password_hash: &str) -> String {
    hash_sensitive_data(password_hash)
}

/// Timing-safe string comparison to prevent timing attacks
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (byte_a, byte_b) in a.bytes().zip(b.bytes()) {
        result |= byte_a ^ byte_b;
    }
    result == 0
}

/// Whether a submitted field name carries a credential
pub fn is_sensitive_field(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    ["password", "passwd", "secret", "token"]
        .iter()
        .any(|indicator| name.contains(indicator))
}

/// Security headers for HTTP responses
pub struct SecurityHeaders;

impl SecurityHeaders {
    /// Get standard security headers as a vector of tuples
    pub fn standard() -> Vec<(&'static str, &'static str)> {
        vec![
            ("X-Content-Type-Options", "nosniff"),
            ("X-Frame-Options", "DENY"),
            ("Referrer-Policy", "strict-origin-when-cross-origin"),
            (
                "Content-Security-Policy",
                "default-src 'self'; style-src 'self' 'unsafe-inline'; form-action 'self'; frame-ancestors 'none'",
            ),
        ]
    }
}
