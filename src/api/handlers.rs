//! HTTP Request Handlers
//!
//! Page handlers for the account flows. Each flow is a GET that renders a form
//! and a POST that validates it, persists the change and answers with either a
//! redirect or the re-rendered form.

use std::sync::Arc;

use axum::{
    extract::{rejection::FormRejection, State},
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::cookies::{build_cookie, SESSION_COOKIE};
use super::flash::{FlashMessage, IncomingFlash};
use super::middleware::{CurrentUser, MaybeUser};
use super::pages::{Page, PageTemplates};
use crate::{
    forms::{EditProfileSubmission, EmailChangeForm, FormError, FormErrors, PasswordChangeForm},
    service::{ActivityLog, AuthenticatedUser, SessionService, UserService, UserServiceError},
    utils::{
        error::{AppError, AppResult},
        validation::{messages::FORM_HAS_ERRORS, normalize_email},
    },
    VERSION,
};

/// Status banners shown after account changes
pub mod notices {
    pub const PROFILE_UPDATED: &str = "Profile updated successfully.";
    pub const PROFILE_SAVE_FAILED: &str = "Error saving profile.";
    pub const PASSWORD_CHANGED: &str = "Password changed successfully.";
    pub const PASSWORD_CHANGE_FAILED: &str = "Error changing password.";
    pub const EMAIL_CHANGED: &str = "Email changed successfully.";
    pub const EMAIL_CHANGE_FAILED: &str = "Error changing email.";
}

const EDIT_PROFILE_FIELDS: &[&str] = &["email", "username", "first_name", "last_name", "bio"];
const PASSWORD_FIELDS: &[&str] = &["old_password", "new_password1", "new_password2"];
const EMAIL_FIELDS: &[&str] = &["new_email"];

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub session_service: Arc<SessionService>,
    pub pages: Arc<PageTemplates>,
    pub activity_log: ActivityLog,
    /// Adds the `Secure` attribute to cookies
    pub cookie_secure: bool,
}

impl AppState {
    pub fn new(
        user_service: UserService,
        session_service: SessionService,
        pages: PageTemplates,
    ) -> Self {
        Self {
            user_service: Arc::new(user_service),
            session_service: Arc::new(session_service),
            pages: Arc::new(pages),
            activity_log: ActivityLog::default(),
            cookie_secure: false,
        }
    }

    pub fn with_activity_log(mut self, activity_log: ActivityLog) -> Self {
        self.activity_log = activity_log;
        self
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    /// Issues a session token for `account` and wraps it in a `Set-Cookie` value
    pub fn session_cookie(&self, account: &AuthenticatedUser) -> AppResult<String> {
        let token = self
            .session_service
            .issue(account)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        Ok(build_cookie(
            SESSION_COOKIE,
            &token,
            self.session_service.ttl().num_seconds(),
            self.cookie_secure,
        ))
    }

    /// Redirect carrying a flash message for the next page
    pub fn redirect_with_flash(&self, location: &str, flash: FlashMessage) -> Response {
        redirect_with_cookies(location, vec![flash.to_cookie(self.cookie_secure)])
    }
}

/// See-other redirect that also sets `cookies`
pub fn redirect_with_cookies(location: &str, cookies: Vec<String>) -> Response {
    let cookies = cookies.into_iter().map(|cookie| (SET_COOKIE, cookie));
    (AppendHeaders(cookies), Redirect::to(location)).into_response()
}

/// The decoded form body, or an empty submission when the body is unreadable.
///
/// An empty submission fails validation, so the caller re-renders its page
/// with field errors instead of answering with a bare rejection.
pub fn submitted<T: Default>(form: Result<Form<T>, FormRejection>) -> T {
    match form {
        Ok(Form(value)) => value,
        Err(rejection) => {
            log::warn!("Unreadable form submission: {}", rejection);
            T::default()
        }
    }
}

/// Landing page; signed-in visitors go straight to the user list
pub async fn home(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    flash: IncomingFlash,
) -> AppResult<Response> {
    if current.is_some() {
        return Ok(Redirect::to("/users/").into_response());
    }

    Page::new("home.html", None, flash).render(&state.pages)
}

/// Every registered user, oldest first
pub async fn user_list(
    State(state): State<AppState>,
    MaybeUser(current): MaybeUser,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let users = state.user_service.list_users().await?;

    Page::new("user_list.html", current.as_ref().map(|a| &a.user), flash)
        .with("users", &users)
        .render(&state.pages)
}

/// The caller's profile, provisioned on first visit if missing
pub async fn profile(
    State(state): State<AppState>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let profile = state
        .user_service
        .get_or_create_profile(account.user.id)
        .await?;

    Page::new("profile.html", Some(&account.user), flash)
        .with("full_name", &profile.full_name())
        .with("profile", &profile)
        .render(&state.pages)
}

fn edit_profile_page(
    account: &AuthenticatedUser,
    flash: IncomingFlash,
    form: &EditProfileSubmission,
    errors: &FormErrors,
) -> Page {
    Page::new("edit_profile.html", Some(&account.user), flash)
        .with("form", form)
        .with("errors", &errors.to_context(EDIT_PROFILE_FIELDS))
}

/// Profile edit form pre-populated from storage
pub async fn edit_profile_form(
    State(state): State<AppState>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    flash: IncomingFlash,
) -> AppResult<Response> {
    let profile = state
        .user_service
        .get_or_create_profile(account.user.id)
        .await?;
    let form = EditProfileSubmission::from_records(&account.user, &profile);

    edit_profile_page(&account, flash, &form, &FormErrors::new()).render(&state.pages)
}

/// Validates both profile forms and saves them together
pub async fn edit_profile_submit(
    State(state): State<AppState>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    flash: IncomingFlash,
    submission: Result<Form<EditProfileSubmission>, FormRejection>,
) -> AppResult<Response> {
    let submission = submitted(submission);
    let (user_changes, profile_changes) = match submission.clean() {
        Ok(changes) => changes,
        Err(errors) => {
            state.activity_log.failure(FORM_HAS_ERRORS, &submission);
            return edit_profile_page(&account, flash, &submission, &errors)
                .message(FlashMessage::error(FORM_HAS_ERRORS))
                .render(&state.pages);
        }
    };

    let result = state
        .user_service
        .update_user_and_profile(account.user.id, user_changes, profile_changes)
        .await;

    match result {
        Ok(_) => {
            state.activity_log.success(notices::PROFILE_UPDATED, &submission);
            Ok(state.redirect_with_flash("/profile/", FlashMessage::success(notices::PROFILE_UPDATED)))
        }
        Err(UserServiceError::EmailAlreadyExists) => {
            let email = normalize_email(&submission.email);
            let errors = FormErrors::single("email", EmailChangeForm::duplicate_message(&email));
            state.activity_log.failure(FORM_HAS_ERRORS, &submission);
            edit_profile_page(&account, flash, &submission, &errors)
                .message(FlashMessage::error(FORM_HAS_ERRORS))
                .render(&state.pages)
        }
        Err(e) => {
            state
                .activity_log
                .failure(&format!("{} {}", notices::PROFILE_SAVE_FAILED, e), &submission);
            edit_profile_page(&account, flash, &submission, &FormErrors::new())
                .message(FlashMessage::error(notices::PROFILE_SAVE_FAILED))
                .render(&state.pages)
        }
    }
}

fn change_password_page(
    account: &AuthenticatedUser,
    flash: IncomingFlash,
    errors: &FormErrors,
) -> Page {
    Page::new("change_password.html", Some(&account.user), flash)
        .with("errors", &errors.to_context(PASSWORD_FIELDS))
}

pub async fn change_password_form(
    State(state): State<AppState>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    flash: IncomingFlash,
) -> AppResult<Response> {
    change_password_page(&account, flash, &FormErrors::new()).render(&state.pages)
}

/// Rotates the password and re-issues the caller's session cookie
pub async fn change_password_submit(
    State(state): State<AppState>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    flash: IncomingFlash,
    form: Result<Form<PasswordChangeForm>, FormRejection>,
) -> AppResult<Response> {
    let form = submitted(form);
    let change = match form.clean() {
        Ok(change) => change,
        Err(errors) => {
            state.activity_log.failure(FORM_HAS_ERRORS, &form);
            return change_password_page(&account, flash, &errors)
                .message(FlashMessage::error(FORM_HAS_ERRORS))
                .render(&state.pages);
        }
    };

    let result = state
        .user_service
        .change_password(account.user.id, &change.old_password, &change.new_password)
        .await;

    match result {
        Ok(updated) => {
            let cookie = state.session_cookie(&updated)?;
            state.activity_log.success(notices::PASSWORD_CHANGED, &form);
            change_password_page(&updated, flash, &FormErrors::new())
                .message(FlashMessage::success(notices::PASSWORD_CHANGED))
                .cookie(cookie)
                .render(&state.pages)
        }
        Err(UserServiceError::InvalidCredentials) => {
            state.activity_log.failure(FORM_HAS_ERRORS, &form);
            change_password_page(&account, flash, &PasswordChangeForm::incorrect_old_password())
                .message(FlashMessage::error(FORM_HAS_ERRORS))
                .render(&state.pages)
        }
        Err(e) => {
            state
                .activity_log
                .failure(&format!("{} {}", notices::PASSWORD_CHANGE_FAILED, e), &form);
            change_password_page(&account, flash, &FormErrors::new())
                .message(FlashMessage::error(notices::PASSWORD_CHANGE_FAILED))
                .render(&state.pages)
        }
    }
}

fn change_email_page(
    account: &AuthenticatedUser,
    flash: IncomingFlash,
    form: &EmailChangeForm,
    errors: &FormErrors,
) -> Page {
    Page::new("change_email.html", Some(&account.user), flash)
        .with("form", form)
        .with("errors", &errors.to_context(EMAIL_FIELDS))
}

pub async fn change_email_form(
    State(state): State<AppState>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    flash: IncomingFlash,
) -> AppResult<Response> {
    change_email_page(&account, flash, &EmailChangeForm::default(), &FormErrors::new())
        .render(&state.pages)
}

/// Moves the account to a new, unused email address
pub async fn change_email_submit(
    State(state): State<AppState>,
    Extension(CurrentUser(account)): Extension<CurrentUser>,
    flash: IncomingFlash,
    form: Result<Form<EmailChangeForm>, FormRejection>,
) -> AppResult<Response> {
    let form = submitted(form);
    let invalid = |errors: FormErrors, flash: IncomingFlash| {
        state.activity_log.failure(FORM_HAS_ERRORS, &form);
        change_email_page(&account, flash, &form, &errors)
            .message(FlashMessage::error(FORM_HAS_ERRORS))
            .render(&state.pages)
    };
    let failed = |e: UserServiceError, flash: IncomingFlash| {
        state
            .activity_log
            .failure(&format!("{} {}", notices::EMAIL_CHANGE_FAILED, e), &form);
        change_email_page(&account, flash, &form, &FormErrors::new())
            .message(FlashMessage::error(notices::EMAIL_CHANGE_FAILED))
            .render(&state.pages)
    };

    let new_email = match form.clean(account.user.id, &state.user_service).await {
        Ok(email) => email,
        Err(FormError::Invalid(errors)) => return invalid(errors, flash),
        Err(FormError::Service(e)) => return failed(e, flash),
    };

    match state.user_service.change_email(account.user.id, &new_email).await {
        Ok(_) => {
            state.activity_log.success(notices::EMAIL_CHANGED, &form);
            Ok(state.redirect_with_flash("/profile/", FlashMessage::success(notices::EMAIL_CHANGED)))
        }
        // Lost a race with another account claiming the same address
        Err(UserServiceError::EmailAlreadyExists) => invalid(
            FormErrors::single("new_email", EmailChangeForm::duplicate_message(&new_email)),
            flash,
        ),
        Err(e) => failed(e, flash),
    }
}

/// Health check response payload
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<HealthCheckResponse>> {
    state.user_service.health_check().await?;

    Ok(Json(HealthCheckResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: VERSION.to_string(),
    }))
}
