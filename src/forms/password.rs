//! Credential forms: password change, login and signup

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::forms::account::{require, validation_errors};
use crate::forms::errors::{FormError, FormErrors};
use crate::models::NewUser;
use crate::service::user::{UserService, UserServiceError};
use crate::utils::validation::{
    blank_to_none, email_validator, messages, normalize_email, password_strength_validator,
};

/// Message shown when signing up with an address that already has an account
pub const EMAIL_REGISTERED: &str = "A user with that email already exists.";

fn check_confirmation(errors: &mut FormErrors, field: &str, first: &str, second: &str) {
    if !first.is_empty() && !second.is_empty() && first != second {
        errors.add(field, messages::PASSWORD_MISMATCH);
    }
}

/// Cleaned password change
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

/// Password change for the logged-in user
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PasswordChangeForm {
    #[serde(default)]
    pub old_password: String,

    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    #[validate(custom(function = "password_strength_validator"))]
    pub new_password1: String,

    #[serde(default)]
    pub new_password2: String,
}

impl PasswordChangeForm {
    pub fn clean(&self) -> Result<PasswordChange, FormErrors> {
        let mut errors = validation_errors(self);
        require(&mut errors, "old_password", &self.old_password);
        require(&mut errors, "new_password1", &self.new_password1);
        require(&mut errors, "new_password2", &self.new_password2);
        check_confirmation(&mut errors, "new_password2", &self.new_password1, &self.new_password2);

        errors.into_result(PasswordChange {
            old_password: self.old_password.clone(),
            new_password: self.new_password1.clone(),
        })
    }

    /// Error set for a rejected current password
    pub fn incorrect_old_password() -> FormErrors {
        FormErrors::single("old_password", messages::OLD_PASSWORD_INCORRECT)
    }
}

/// Email and password login
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    /// Where to go after a successful login
    #[serde(default)]
    pub next: Option<String>,
}

impl LoginForm {
    /// Returns the normalized email and the raw password
    pub fn clean(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        require(&mut errors, "email", &self.email);
        require(&mut errors, "password", &self.password);

        errors.into_result((normalize_email(&self.email), self.password.clone()))
    }

    /// Error set for an unknown email or wrong password
    pub fn invalid_credentials() -> FormErrors {
        let mut errors = FormErrors::new();
        errors.add_non_field(messages::INVALID_LOGIN);
        errors
    }

    /// The `next` target if it stays on this site, else `/profile/`
    pub fn redirect_target(&self) -> String {
        safe_next(self.next.as_deref()).unwrap_or("/profile/").to_string()
    }
}

/// Accepts only same-site absolute paths
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    let next = next?.trim();
    let local = next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.contains("://");

    local.then_some(next)
}

/// Account registration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SignupForm {
    #[serde(default)]
    #[validate(length(max = 254, message = "Ensure this value has at most 254 characters."))]
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 256, message = "Ensure this value has at most 256 characters."))]
    pub username: String,

    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    #[validate(custom(function = "password_strength_validator"))]
    pub password1: String,

    #[serde(default)]
    pub password2: String,
}

impl SignupForm {
    /// Validates the submission and checks that the email is still free
    pub async fn clean(&self, users: &UserService) -> Result<NewUser, FormError> {
        let mut errors = validation_errors(self);
        require(&mut errors, "email", &self.email);
        require(&mut errors, "password1", &self.password1);
        require(&mut errors, "password2", &self.password2);
        check_confirmation(&mut errors, "password2", &self.password1, &self.password2);

        let email = errors.into_result(normalize_email(&self.email))?;

        match users.get_user_by_email(&email).await {
            Ok(_) => return Err(Self::email_registered().into()),
            Err(UserServiceError::UserNotFound) => {}
            Err(e) => return Err(e.into()),
        }

        Ok(NewUser {
            email,
            username: blank_to_none(&self.username),
            password: self.password1.clone(),
        })
    }

    pub fn email_registered() -> FormErrors {
        FormErrors::single("email", EMAIL_REGISTERED)
    }
}
