//! Profile and email forms
//!
//! The user edit and profile forms are structural only. The email change form
//! additionally checks that no other account holds the requested address.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::forms::errors::{FormError, FormErrors};
use crate::models::{Profile, ProfileChanges, User, UserChanges};
use crate::service::user::UserService;
use crate::utils::validation::{blank_to_none, email_validator, messages, normalize_email};

/// Marks `field` as required when `value` is blank, dropping other messages for it
pub(crate) fn require(errors: &mut FormErrors, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.replace(field, messages::FIELD_REQUIRED);
    }
}

pub(crate) fn validation_errors<T: Validate>(form: &T) -> FormErrors {
    form.validate().map(|_| FormErrors::new()).unwrap_or_else(FormErrors::from)
}

/// Account fields editable from the profile page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct UserEditForm {
    #[serde(default)]
    #[validate(length(max = 254, message = "Ensure this value has at most 254 characters."))]
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 256, message = "Ensure this value has at most 256 characters."))]
    pub username: String,
}

impl UserEditForm {
    pub fn clean(&self) -> Result<UserChanges, FormErrors> {
        let mut errors = validation_errors(self);
        require(&mut errors, "email", &self.email);

        errors.into_result(UserChanges {
            email: normalize_email(&self.email),
            username: blank_to_none(&self.username),
        })
    }
}

/// Personal fields stored on the profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ProfileForm {
    #[serde(default)]
    #[validate(length(max = 256, message = "Ensure this value has at most 256 characters."))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(max = 256, message = "Ensure this value has at most 256 characters."))]
    pub last_name: String,

    #[serde(default)]
    #[validate(length(max = 5000, message = "Ensure this value has at most 5000 characters."))]
    pub bio: String,
}

impl ProfileForm {
    pub fn clean(&self) -> Result<ProfileChanges, FormErrors> {
        validation_errors(self).into_result(ProfileChanges {
            first_name: blank_to_none(&self.first_name),
            last_name: blank_to_none(&self.last_name),
            bio: blank_to_none(&self.bio),
        })
    }
}

/// Body of the profile edit page, which posts both forms at once
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditProfileSubmission {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
}

impl EditProfileSubmission {
    /// Pre-populates the page from stored state
    pub fn from_records(user: &User, profile: &Profile) -> Self {
        Self {
            email: user.email.clone(),
            username: user.username.clone(),
            first_name: profile.first_name.clone().unwrap_or_default(),
            last_name: profile.last_name.clone().unwrap_or_default(),
            bio: profile.bio.clone().unwrap_or_default(),
        }
    }

    pub fn user_form(&self) -> UserEditForm {
        UserEditForm {
            email: self.email.clone(),
            username: self.username.clone(),
        }
    }

    pub fn profile_form(&self) -> ProfileForm {
        ProfileForm {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            bio: self.bio.clone(),
        }
    }

    /// Cleans both forms, reporting the errors of both when either fails
    pub fn clean(&self) -> Result<(UserChanges, ProfileChanges), FormErrors> {
        match (self.user_form().clean(), self.profile_form().clean()) {
            (Ok(user), Ok(profile)) => Ok((user, profile)),
            (user, profile) => {
                let mut errors = FormErrors::new();
                if let Err(e) = user {
                    errors.merge(e);
                }
                if let Err(e) = profile {
                    errors.merge(e);
                }
                Err(errors)
            }
        }
    }
}

/// Request to move the account to a new email address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct EmailChangeForm {
    #[serde(default)]
    #[validate(length(max = 254, message = "Ensure this value has at most 254 characters."))]
    #[validate(custom(function = "email_validator"))]
    pub new_email: String,
}

impl EmailChangeForm {
    /// Message for an address held by someone else
    pub fn duplicate_message(email: &str) -> String {
        format!("Email {} is already used by another user.", email)
    }

    /// Returns the normalized new email, or errors when it is malformed or
    /// belongs to an account other than `acting_user`.
    pub async fn clean(&self, acting_user: Uuid, users: &UserService) -> Result<String, FormError> {
        let mut errors = validation_errors(self);
        require(&mut errors, "new_email", &self.new_email);
        let email = errors.into_result(normalize_email(&self.new_email))?;

        if users.email_taken_by_other(&email, acting_user).await? {
            return Err(FormErrors::single("new_email", Self::duplicate_message(&email)).into());
        }

        Ok(email)
    }
}
