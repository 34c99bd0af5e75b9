//! Login, logout and signup handlers

use axum::{
    extract::{rejection::FormRejection, Query, State},
    response::Response,
    Form,
};
use serde::Deserialize;
use serde_json::json;

use super::cookies::{expire_cookie, SESSION_COOKIE};
use super::flash::{FlashMessage, IncomingFlash};
use super::handlers::{redirect_with_cookies, submitted, AppState};
use super::middleware::MaybeUser;
use super::pages::Page;
use crate::{
    forms::{password::safe_next, FormError, FormErrors, LoginForm, SignupForm},
    service::UserServiceError,
    utils::{error::AppResult, validation::messages::FORM_HAS_ERRORS},
};

const LOGIN_FIELDS: &[&str] = &["email", "password"];
const SIGNUP_FIELDS: &[&str] = &["email", "username", "password1", "password2"];

pub const LOGGED_OUT: &str = "You have been logged out.";
pub const SIGNUP_FAILED: &str = "Error creating account.";
pub const WELCOME: &str = "Welcome! Your account has been created.";

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

fn login_page(current: &MaybeUser, flash: IncomingFlash, form: &LoginForm, errors: &FormErrors) -> Page {
    Page::new("login.html", current.0.as_ref().map(|a| &a.user), flash)
        .with(
            "form",
            &json!({
                "email": form.email,
                "next": safe_next(form.next.as_deref()),
            }),
        )
        .with("errors", &errors.to_context(LOGIN_FIELDS))
}

pub async fn login_form(
    State(state): State<AppState>,
    current: MaybeUser,
    flash: IncomingFlash,
    Query(query): Query<LoginQuery>,
) -> AppResult<Response> {
    let form = LoginForm {
        next: query.next,
        ..LoginForm::default()
    };

    login_page(&current, flash, &form, &FormErrors::new()).render(&state.pages)
}

/// Checks credentials and starts a session
pub async fn login_submit(
    State(state): State<AppState>,
    current: MaybeUser,
    flash: IncomingFlash,
    form: Result<Form<LoginForm>, FormRejection>,
) -> AppResult<Response> {
    let form = submitted(form);
    let (email, password) = match form.clean() {
        Ok(credentials) => credentials,
        Err(errors) => {
            state.activity_log.failure("Login failed", &form);
            return login_page(&current, flash, &form, &errors).render(&state.pages);
        }
    };

    match state.user_service.authenticate(&email, &password).await {
        Ok(account) => {
            let cookie = state.session_cookie(&account)?;
            state.activity_log.success("Logged in", &form);
            Ok(redirect_with_cookies(&form.redirect_target(), vec![cookie]))
        }
        Err(UserServiceError::InvalidCredentials) => {
            state.activity_log.failure("Login failed", &form);
            login_page(&current, flash, &form, &LoginForm::invalid_credentials()).render(&state.pages)
        }
        Err(e) => Err(e.into()),
    }
}

/// Ends the session
pub async fn logout(State(state): State<AppState>, MaybeUser(current): MaybeUser) -> Response {
    if let Some(account) = current {
        log::info!("User {} logged out", account.user.id);
    }

    redirect_with_cookies(
        "/",
        vec![
            expire_cookie(SESSION_COOKIE),
            FlashMessage::success(LOGGED_OUT).to_cookie(state.cookie_secure),
        ],
    )
}

fn signup_page(current: &MaybeUser, flash: IncomingFlash, form: &SignupForm, errors: &FormErrors) -> Page {
    Page::new("signup.html", current.0.as_ref().map(|a| &a.user), flash)
        .with("form", &json!({"email": form.email, "username": form.username}))
        .with("errors", &errors.to_context(SIGNUP_FIELDS))
}

pub async fn signup_form(
    State(state): State<AppState>,
    current: MaybeUser,
    flash: IncomingFlash,
) -> AppResult<Response> {
    signup_page(&current, flash, &SignupForm::default(), &FormErrors::new()).render(&state.pages)
}

/// Registers an account with its profile and logs it in
pub async fn signup_submit(
    State(state): State<AppState>,
    current: MaybeUser,
    flash: IncomingFlash,
    form: Result<Form<SignupForm>, FormRejection>,
) -> AppResult<Response> {
    let form = submitted(form);
    let invalid = |errors: FormErrors, flash: IncomingFlash| {
        state.activity_log.failure(FORM_HAS_ERRORS, &form);
        signup_page(&current, flash, &form, &errors)
            .message(FlashMessage::error(FORM_HAS_ERRORS))
            .render(&state.pages)
    };

    let new_user = match form.clean(&state.user_service).await {
        Ok(new_user) => new_user,
        Err(FormError::Invalid(errors)) => return invalid(errors, flash),
        Err(FormError::Service(e)) => return Err(e.into()),
    };
    let password = new_user.password.clone();

    let user = match state.user_service.create_user_with_profile(new_user).await {
        Ok(user) => user,
        Err(UserServiceError::EmailAlreadyExists) => {
            return invalid(SignupForm::email_registered(), flash)
        }
        Err(e) => {
            state
                .activity_log
                .failure(&format!("{} {}", SIGNUP_FAILED, e), &form);
            return signup_page(&current, flash, &form, &FormErrors::new())
                .message(FlashMessage::error(SIGNUP_FAILED))
                .render(&state.pages);
        }
    };

    let account = state.user_service.authenticate(&user.email, &password).await?;
    let cookie = state.session_cookie(&account)?;
    state.activity_log.success("Account created", &form);

    Ok(redirect_with_cookies(
        "/profile/",
        vec![cookie, FlashMessage::success(WELCOME).to_cookie(state.cookie_secure)],
    ))
}
