//! Forms
//!
//! Validation of submitted form fields into normalized values or field errors.
//! Nothing here writes to storage.

pub mod account;
pub mod errors;
pub mod password;

pub use account::{EditProfileSubmission, EmailChangeForm, ProfileForm, UserEditForm};
pub use errors::{FormError, FormErrors};
pub use password::{LoginForm, PasswordChange, PasswordChangeForm, SignupForm};
