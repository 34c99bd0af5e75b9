//! Validation Utilities
//!
//! Input validation and normalization helpers shared by the form layer.

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

use crate::utils::security::fits_bcrypt_input;

/// Validates email address format using a comprehensive regex pattern
pub fn validate_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    regex.is_match(email.trim())
}

/// Normalizes email address to lowercase and removes whitespace
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Returns the part of an email address before the `@`
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Picks the display name to store: the trimmed candidate, or the email's
/// local part when the candidate is missing or blank.
pub fn resolve_username(candidate: Option<&str>, email: &str) -> String {
    match candidate.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => email_local_part(email).to_string(),
    }
}

/// Trims free text and maps blank input to `None`
pub fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Custom validator for email fields using the validator crate
pub fn email_validator(email: &str) -> Result<(), ValidationError> {
    if validate_email(email) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_email").with_message(messages::INVALID_EMAIL.into()))
    }
}

/// Validates password strength according to security requirements.
///
/// Passwords longer than bcrypt's input limit are refused outright, since
/// the bytes past the limit would not be part of the stored hash.
pub fn password_strength_validator(password: &str) -> Result<(), ValidationError> {
    let rule = |code: &'static str, message: &'static str| -> Result<(), ValidationError> {
        Err(ValidationError::new(code).with_message(message.into()))
    };

    if !fits_bcrypt_input(password) {
        return rule("password_too_long", messages::PASSWORD_TOO_LONG);
    }

    if !password.chars().any(|c| c.is_lowercase()) {
        return rule("password_lowercase", messages::PASSWORD_LOWERCASE);
    }

    if !password.chars().any(|c| c.is_uppercase()) {
        return rule("password_uppercase", messages::PASSWORD_UPPERCASE);
    }

    if !password.chars().any(|c| c.is_numeric()) {
        return rule("password_digit", messages::PASSWORD_DIGIT);
    }

    if !password.chars().any(|c| !c.is_alphanumeric()) {
        return rule("password_special", messages::PASSWORD_SPECIAL);
    }

    Ok(())
}

/// Validation error messages for user-friendly responses
pub mod messages {
    pub const INVALID_EMAIL: &str = "Enter a valid email address.";
    pub const FIELD_REQUIRED: &str = "This field is required.";
    pub const PASSWORD_LENGTH: &str = "Password must be at least 8 characters.";
    pub const PASSWORD_TOO_LONG: &str = "Password must be at most 72 bytes long.";
    pub const PASSWORD_LOWERCASE: &str = "Password must contain at least one lowercase letter.";
    pub const PASSWORD_UPPERCASE: &str = "Password must contain at least one uppercase letter.";
    pub const PASSWORD_DIGIT: &str = "Password must contain at least one digit.";
    pub const PASSWORD_SPECIAL: &str = "Password must contain at least one special character.";
    pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
    pub const OLD_PASSWORD_INCORRECT: &str =
        "Your old password was entered incorrectly. Please enter it again.";
    pub const INVALID_LOGIN: &str = "Please enter a correct email and password.";
    pub const FORM_HAS_ERRORS: &str = "The form contains errors, please check the entered data.";
}
