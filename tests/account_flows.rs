//! End-to-end tests driving the full router over an in-memory database.

use account_service::{
    api::{create_app, AppState, PageTemplates},
    database::connect_in_memory,
    service::{SessionService, UserService},
    NewUser, User,
};
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use sqlx::SqlitePool;
use tower::ServiceExt;

const SECRET: &str = "integration_test_session_secret_0123456789";
const PASSWORD: &str = "SecurePass123!";

struct TestApp {
    app: Router,
    users: UserService,
    pool: SqlitePool,
}

impl TestApp {
    async fn new() -> Self {
        let pool = connect_in_memory().await.unwrap();
        let users = UserService::new(pool.clone()).with_bcrypt_cost(4);
        let state = AppState::new(
            users.clone(),
            SessionService::new(SECRET.to_string()),
            PageTemplates::new().unwrap(),
        );

        Self {
            app: create_app(state),
            users,
            pool,
        }
    }

    /// Makes every later write to `profiles` fail inside the database
    async fn break_profile_storage(&self) {
        for event in ["INSERT", "UPDATE"] {
            sqlx::query(&format!(
                "CREATE TRIGGER reject_profile_{0} BEFORE {0} ON profiles
                 BEGIN SELECT RAISE(ABORT, 'profile storage unavailable'); END",
                event.to_lowercase()
            ))
            .execute(&self.pool)
            .await
            .unwrap();
        }
    }

    async fn create_user(&self, email: &str) -> User {
        self.users
            .create_user_with_profile(NewUser {
                email: email.to_string(),
                username: None,
                password: PASSWORD.to_string(),
            })
            .await
            .unwrap()
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn post(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response {
        let mut request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        self.app
            .clone()
            .oneshot(request.body(Body::from(form.to_string())).unwrap())
            .await
            .unwrap()
    }

    /// Logs in and returns the `Cookie` header value for the session
    async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post(
                "/accounts/login/",
                &format!("email={}&password={}", email, password),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        session_cookie(&response).expect("login should set a session cookie")
    }
}

/// `name=value` of a cookie set (not expired) by the response
fn set_cookie(response: &Response, name: &str) -> Option<String> {
    let prefix = format!("{}=", name);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter(|value| value.starts_with(&prefix) && !value.starts_with(&format!("{};", prefix)))
        .map(|value| value.split(';').next().unwrap_or_default().to_string())
        .next()
}

fn session_cookie(response: &Response) -> Option<String> {
    set_cookie(response, "sessionid")
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// ============================================================================
// Authentication guard
// ============================================================================

#[tokio::test]
async fn anonymous_edit_profile_redirects_to_login() {
    let app = TestApp::new().await;
    let user = app.create_user("guarded@example.com").await;

    let response = app.get("/profile/edit/", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/accounts/login/?next=%2Fprofile%2Fedit%2F");

    // The login page carries the decoded target into its form, HTML-escaped
    let login_page = app.get(location(&response), None).await;
    let body = body_text(login_page).await;
    assert!(body.contains(r#"name="next" value="&#x2F;profile&#x2F;edit&#x2F;""#));

    let response = app
        .post(
            "/profile/edit/",
            "email=hijacked@example.com&username=evil&first_name=&last_name=&bio=",
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/accounts/login/"));

    let stored = app.users.get_user_by_id(user.id).await.unwrap();
    assert_eq!(stored.email, "guarded@example.com");
    assert_eq!(stored.username, "guarded");
}

#[tokio::test]
async fn protected_pages_require_login() {
    let app = TestApp::new().await;

    for uri in ["/profile/", "/change-password/", "/change-email/"] {
        let response = app.get(uri, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", uri);
        assert_eq!(
            location(&response),
            format!("/accounts/login/?next={}", uri.replace('/', "%2F"))
        );
    }
}

#[tokio::test]
async fn forged_session_cookie_is_rejected_and_cleared() {
    let app = TestApp::new().await;

    let response = app.get("/profile/", Some("sessionid=not.a.token")).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cleared = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|value| value.to_str().unwrap_or_default().starts_with("sessionid=;"));
    assert!(cleared);
}

// ============================================================================
// Public pages, login and signup
// ============================================================================

#[tokio::test]
async fn home_page_depends_on_session() {
    let app = TestApp::new().await;
    app.create_user("home@example.com").await;

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = app.login("home@example.com", PASSWORD).await;
    let response = app.get("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/");
}

#[tokio::test]
async fn user_list_shows_all_users() {
    let app = TestApp::new().await;
    app.create_user("first@example.com").await;
    app.create_user("second@example.com").await;

    let response = app.get("/users/", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    let first = body.find("first@example.com").unwrap();
    let second = body.find("second@example.com").unwrap();
    assert!(first < second);
}

#[tokio::test]
async fn login_sets_session_and_follows_next() {
    let app = TestApp::new().await;
    app.create_user("next@example.com").await;

    let response = app
        .post(
            "/accounts/login/",
            &format!("email=next@example.com&password={}&next=/change-email/", PASSWORD),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/change-email/");

    let cookie = session_cookie(&response).unwrap();
    let response = app.get("/profile/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("next@example.com"));

    let user = app.users.get_user_by_email("next@example.com").await.unwrap();
    assert!(user.last_login.is_some());
}

#[tokio::test]
async fn login_ignores_offsite_next() {
    let app = TestApp::new().await;
    app.create_user("offsite@example.com").await;

    let response = app
        .post(
            "/accounts/login/",
            &format!(
                "email=offsite@example.com&password={}&next=https://evil.example.com/",
                PASSWORD
            ),
            None,
        )
        .await;

    assert_eq!(location(&response), "/profile/");
}

#[tokio::test]
async fn wrong_password_rerenders_login() {
    let app = TestApp::new().await;
    app.create_user("wrong@example.com").await;

    let response = app
        .post("/accounts/login/", "email=wrong@example.com&password=Nope123!", None)
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
    assert!(body_text(response)
        .await
        .contains("Please enter a correct email and password."));
}

#[tokio::test]
async fn signup_derives_username_and_provisions_profile() {
    let app = TestApp::new().await;

    let response = app
        .post(
            "/accounts/signup/",
            &format!("email=a@example.com&username=&password1={0}&password2={0}", PASSWORD),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/");
    assert!(session_cookie(&response).is_some());

    let user = app.users.get_user_by_email("a@example.com").await.unwrap();
    assert_eq!(user.username, "a");
    assert!(app.users.get_or_create_profile(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn signup_with_registered_email_fails() {
    let app = TestApp::new().await;
    app.create_user("taken@example.com").await;

    let response = app
        .post(
            "/accounts/signup/",
            &format!("email=taken@example.com&password1={0}&password2={0}", PASSWORD),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("A user with that email already exists."));
    assert_eq!(app.users.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn logout_clears_session() {
    let app = TestApp::new().await;
    app.create_user("bye@example.com").await;
    let cookie = app.login("bye@example.com", PASSWORD).await;

    let response = app.post("/accounts/logout/", "", Some(&cookie)).await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert!(session_cookie(&response).is_none());
    assert!(set_cookie(&response, "flash").is_some());
}

// ============================================================================
// Profile edit
// ============================================================================

#[tokio::test]
async fn profile_edit_is_idempotent() {
    let app = TestApp::new().await;
    let user = app.create_user("editor@example.com").await;
    let cookie = app.login("editor@example.com", PASSWORD).await;
    let form = "email=editor@example.com&username=Editor&first_name=Ed&last_name=Itor&bio=Writes+things";

    let first = app.post("/profile/edit/", form, Some(&cookie)).await;
    assert_eq!(first.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&first), "/profile/");
    let profile_after_first = app.users.get_or_create_profile(user.id).await.unwrap();

    let second = app.post("/profile/edit/", form, Some(&cookie)).await;
    assert_eq!(second.status(), StatusCode::SEE_OTHER);
    let profile_after_second = app.users.get_or_create_profile(user.id).await.unwrap();

    assert_eq!(profile_after_first, profile_after_second);
    assert_eq!(profile_after_second.first_name.as_deref(), Some("Ed"));
    assert_eq!(profile_after_second.bio.as_deref(), Some("Writes things"));
    assert_eq!(app.users.get_user_by_id(user.id).await.unwrap().username, "Editor");

    let page = app.get("/profile/", Some(&cookie)).await;
    assert!(body_text(page).await.contains(r#"<p class="full-name">Ed Itor</p>"#));
}

#[tokio::test]
async fn profile_edit_flash_shown_once() {
    let app = TestApp::new().await;
    app.create_user("flash@example.com").await;
    let cookie = app.login("flash@example.com", PASSWORD).await;

    let response = app
        .post(
            "/profile/edit/",
            "email=flash@example.com&username=&first_name=&last_name=&bio=",
            Some(&cookie),
        )
        .await;
    let flash = set_cookie(&response, "flash").unwrap();

    let page = app
        .get("/profile/", Some(&format!("{}; {}", cookie, flash)))
        .await;
    assert_eq!(page.status(), StatusCode::OK);
    let consumed = page
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|value| value.to_str().unwrap_or_default().starts_with("flash=;"));
    assert!(consumed);
    assert!(body_text(page).await.contains("Profile updated successfully."));
}

#[tokio::test]
async fn invalid_profile_edit_rerenders_with_errors() {
    let app = TestApp::new().await;
    let user = app.create_user("invalid@example.com").await;
    let cookie = app.login("invalid@example.com", PASSWORD).await;

    let response = app
        .post(
            "/profile/edit/",
            "email=not-an-email&username=&first_name=&last_name=&bio=",
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("The form contains errors, please check the entered data."));
    assert!(body.contains("Enter a valid email address."));
    assert_eq!(
        app.users.get_user_by_id(user.id).await.unwrap().email,
        "invalid@example.com"
    );
}

#[tokio::test]
async fn profile_edit_with_taken_email_reports_field_error() {
    let app = TestApp::new().await;
    let user = app.create_user("owner@example.com").await;
    app.create_user("taken@example.com").await;
    let cookie = app.login("owner@example.com", PASSWORD).await;

    let response = app
        .post(
            "/profile/edit/",
            "email=TAKEN@example.com&username=Owner&first_name=Own&last_name=&bio=",
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Email taken@example.com is already used by another user."));
    assert!(body.contains("The form contains errors, please check the entered data."));

    let stored = app.users.get_user_by_id(user.id).await.unwrap();
    assert_eq!(stored.email, "owner@example.com");
    assert_eq!(stored.username, "owner");
    assert!(app.users.get_or_create_profile(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn profile_edit_storage_failure_shows_banner() {
    let app = TestApp::new().await;
    let user = app.create_user("fragile@example.com").await;
    let cookie = app.login("fragile@example.com", PASSWORD).await;
    app.break_profile_storage().await;

    let response = app
        .post(
            "/profile/edit/",
            "email=fragile@example.com&username=Renamed&first_name=Fra&last_name=Gile&bio=",
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "flash").is_none());
    let body = body_text(response).await;
    assert!(body.contains("Error saving profile."));
    assert!(!body.contains("profile storage unavailable"));

    // The user row was written in the same transaction and rolled back
    let stored = app.users.get_user_by_id(user.id).await.unwrap();
    assert_eq!(stored.username, "fragile");
}

#[tokio::test]
async fn post_without_form_body_rerenders_page() {
    let app = TestApp::new().await;
    app.create_user("bare@example.com").await;
    let cookie = app.login("bare@example.com", PASSWORD).await;

    let request = Request::builder()
        .method("POST")
        .uri("/change-email/")
        .header(header::COOKIE, &cookie)
        .body(Body::from("new_email=x@example.com"))
        .unwrap();
    let response = app.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("This field is required."));
    assert_eq!(
        app.users.get_user_by_email("bare@example.com").await.unwrap().email,
        "bare@example.com"
    );
}

// ============================================================================
// Email change
// ============================================================================

#[tokio::test]
async fn email_change_to_free_address() {
    let app = TestApp::new().await;
    let user = app.create_user("old@example.com").await;
    let cookie = app.login("old@example.com", PASSWORD).await;

    let response = app
        .post("/change-email/", "new_email=fresh@example.com", Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/");
    assert_eq!(
        app.users.get_user_by_id(user.id).await.unwrap().email,
        "fresh@example.com"
    );
}

#[tokio::test]
async fn email_change_to_taken_address_fails() {
    let app = TestApp::new().await;
    let user = app.create_user("mine@example.com").await;
    app.create_user("b@example.com").await;
    let cookie = app.login("mine@example.com", PASSWORD).await;

    let response = app
        .post("/change-email/", "new_email=b@example.com", Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("Email b@example.com is already used by another user."));
    assert_eq!(
        app.users.get_user_by_id(user.id).await.unwrap().email,
        "mine@example.com"
    );
}

#[tokio::test]
async fn email_change_to_own_address_succeeds() {
    let app = TestApp::new().await;
    app.create_user("same@example.com").await;
    let cookie = app.login("same@example.com", PASSWORD).await;

    let response = app
        .post("/change-email/", "new_email=same@example.com", Some(&cookie))
        .await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

// ============================================================================
// Password change
// ============================================================================

#[tokio::test]
async fn two_password_changes_keep_session() {
    let app = TestApp::new().await;
    app.create_user("rotate@example.com").await;
    let original = app.login("rotate@example.com", PASSWORD).await;

    let response = app
        .post(
            "/change-password/",
            &format!("old_password={}&new_password1=Second456!&new_password2=Second456!", PASSWORD),
            Some(&original),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let refreshed = session_cookie(&response).expect("password change should refresh the session");
    assert!(body_text(response).await.contains("Password changed successfully."));

    let response = app
        .post(
            "/change-password/",
            "old_password=Second456!&new_password1=Third789!&new_password2=Third789!",
            Some(&refreshed),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let latest = session_cookie(&response).expect("second change should refresh the session");

    let response = app.get("/profile/", Some(&latest)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Sessions issued for an older credential are stale
    let response = app.get("/profile/", Some(&original)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn wrong_old_password_rejected() {
    let app = TestApp::new().await;
    app.create_user("keep@example.com").await;
    let cookie = app.login("keep@example.com", PASSWORD).await;

    let response = app
        .post(
            "/change-password/",
            "old_password=Wrong123!&new_password1=Second456!&new_password2=Second456!",
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
    assert!(body_text(response)
        .await
        .contains("Your old password was entered incorrectly."));
    assert!(app.users.authenticate("keep@example.com", PASSWORD).await.is_ok());
}

#[tokio::test]
async fn password_change_rejects_bytes_bcrypt_would_drop() {
    let app = TestApp::new().await;
    app.create_user("long@example.com").await;
    let cookie = app.login("long@example.com", PASSWORD).await;
    let long = format!("Aa1!{}", "x".repeat(80));

    let response = app
        .post(
            "/change-password/",
            &format!(
                "old_password={0}&new_password1={1}&new_password2={1}",
                PASSWORD, long
            ),
            Some(&cookie),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
    assert!(body_text(response)
        .await
        .contains("Password must be at most 72 bytes long."));
    assert!(app.users.authenticate("long@example.com", PASSWORD).await.is_ok());
    let same_prefix = format!("Aa1!{}DIFFERENT", "x".repeat(68));
    assert!(app.users.authenticate("long@example.com", &same_prefix).await.is_err());
}

#[tokio::test]
async fn logout_is_post_only() {
    let app = TestApp::new().await;
    app.create_user("stay@example.com").await;
    let cookie = app.login("stay@example.com", PASSWORD).await;

    let response = app.get("/accounts/logout/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = app.get("/profile/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn health_check_reports_healthy() {
    let app = TestApp::new().await;

    let response = app.get("/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
}
