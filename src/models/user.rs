//! User Model
//!
//! Account and profile records as stored in the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User representation safe to hand to templates and other layers
///
/// This struct never carries the password hash. All datetime fields are UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique identifier for the user
    pub id: Uuid,

    /// Display name; derived from the email's local part when left blank
    pub username: String,

    /// Email address (unique, normalized); used to log in
    pub email: String,

    /// Timestamp when the account was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the account was last modified
    pub updated_at: DateTime<Utc>,

    /// Timestamp of the most recent successful login
    pub last_login: Option<DateTime<Utc>>,
}

/// Internal user representation including password hash
///
/// Used for credential checks and session validation. Never rendered.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserWithPassword {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<UserWithPassword> for User {
    /// Strips the password hash
    fn from(user_with_password: UserWithPassword) -> Self {
        User {
            id: user_with_password.id,
            username: user_with_password.username,
            email: user_with_password.email,
            created_at: user_with_password.created_at,
            updated_at: user_with_password.updated_at,
            last_login: user_with_password.last_login,
        }
    }
}

/// Auxiliary personal data owned one-to-one by a [`User`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Profile {
    pub id: i64,

    /// Owning user; unique, cascades on user deletion
    pub user_id: Uuid,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

impl Profile {
    /// Whether no personal field has been filled in yet
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.bio.is_none()
    }

    /// First and last name joined by a space, if any is set
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Input for creating an account together with its profile
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: Option<String>,
    pub password: String,
}

/// Validated user fields from the profile edit form
#[derive(Debug, Clone, PartialEq)]
pub struct UserChanges {
    /// Normalized email
    pub email: String,
    /// Display name; `None` re-derives it from the email
    pub username: Option<String>,
}

/// Validated profile fields from the profile edit form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_with_password_conversion() {
        let user_with_password = UserWithPassword {
            id: Uuid::new_v4(),
            username: "tester".to_string(),
            email: "test@example.com".to_string(),
            password_hash: "hashed_password".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
        };
        let id = user_with_password.id;

        let user: User = user_with_password.into();

        assert_eq!(user.id, id);
        assert_eq!(user.username, "tester");
        assert_eq!(user.email, "test@example.com");
    }

    #[test]
    fn test_profile_helpers() {
        let mut profile = Profile {
            id: 1,
            user_id: Uuid::new_v4(),
            first_name: None,
            last_name: None,
            bio: None,
        };
        assert!(profile.is_empty());
        assert_eq!(profile.full_name(), None);

        profile.last_name = Some("Lovelace".to_string());
        assert_eq!(profile.full_name().as_deref(), Some("Lovelace"));

        profile.first_name = Some("Ada".to_string());
        assert!(!profile.is_empty());
        assert_eq!(profile.full_name().as_deref(), Some("Ada Lovelace"));
    }
}
