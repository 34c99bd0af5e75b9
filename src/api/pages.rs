//! Page rendering
//!
//! HTML pages are Tera templates compiled into the binary. Every page extends
//! `base.html`, which shows the current user and any status messages.

use axum::{
    http::header::SET_COOKIE,
    response::{AppendHeaders, Html, IntoResponse, Response},
};
use serde::Serialize;
use tera::{Context, Tera};

use super::flash::{FlashMessage, IncomingFlash};
use crate::models::User;
use crate::utils::error::{AppError, AppResult};

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/pages/base.html")),
    ("home.html", include_str!("../../templates/pages/home.html")),
    ("user_list.html", include_str!("../../templates/pages/user_list.html")),
    ("profile.html", include_str!("../../templates/pages/profile.html")),
    ("edit_profile.html", include_str!("../../templates/pages/edit_profile.html")),
    ("change_password.html", include_str!("../../templates/pages/change_password.html")),
    ("change_email.html", include_str!("../../templates/pages/change_email.html")),
    ("login.html", include_str!("../../templates/pages/login.html")),
    ("signup.html", include_str!("../../templates/pages/signup.html")),
];

/// Compiled page templates
pub struct PageTemplates {
    tera: Tera,
}

impl PageTemplates {
    pub fn new() -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.iter().copied())
            .map_err(|e| AppError::Configuration(format!("Failed to load page templates: {}", e)))?;

        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, context: &Context) -> AppResult<String> {
        Ok(self.tera.render(name, context)?)
    }
}

/// Builder for a rendered page response
pub struct Page {
    template: &'static str,
    context: Context,
    messages: Vec<FlashMessage>,
    cookies: Vec<String>,
}

impl Page {
    /// Starts a page for `user`, showing and consuming the incoming flash message
    pub fn new(template: &'static str, user: Option<&User>, flash: IncomingFlash) -> Self {
        let mut context = Context::new();
        context.insert("user", &user);

        let mut page = Self {
            template,
            context,
            messages: Vec::new(),
            cookies: Vec::new(),
        };

        if let Some(message) = flash.0 {
            page.messages.push(message);
            page.cookies.push(FlashMessage::clear_cookie());
        }

        page
    }

    pub fn with<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Self {
        self.context.insert(key, value);
        self
    }

    /// Adds a status banner rendered with this page
    pub fn message(mut self, message: FlashMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn cookie(mut self, set_cookie: String) -> Self {
        self.cookies.push(set_cookie);
        self
    }

    pub fn render(mut self, templates: &PageTemplates) -> AppResult<Response> {
        self.context.insert("messages", &self.messages);
        let html = templates.render(self.template, &self.context)?;
        let cookies = self.cookies.into_iter().map(|cookie| (SET_COOKIE, cookie));

        Ok((AppendHeaders(cookies), Html(html)).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use crate::api::flash::FlashLevel;
    use crate::forms::FormErrors;
    use chrono::Utc;
    use uuid::Uuid;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_all_templates_compile() {
        let templates = PageTemplates::new().unwrap();
        assert!(templates.tera.get_template_names().count() >= TEMPLATES.len());
    }

    #[test]
    fn test_render_home_anonymous() {
        let templates = PageTemplates::new().unwrap();
        let mut context = Context::new();
        context.insert("user", &Option::<User>::None);
        context.insert("messages", &Vec::<FlashMessage>::new());

        let html = templates.render("home.html", &context).unwrap();
        assert!(html.contains("/accounts/login/"));
    }

    #[test]
    fn test_render_escapes_user_input() {
        let templates = PageTemplates::new().unwrap();
        let mut context = Context::new();
        let mut shown = user();
        shown.username = "<script>alert(1)</script>".to_string();
        context.insert("user", &Some(&shown));
        context.insert("users", &vec![shown.clone()]);
        context.insert(
            "messages",
            &vec![FlashMessage {
                level: FlashLevel::Success,
                message: "Done".to_string(),
            }],
        );

        let html = templates.render("user_list.html", &context).unwrap();
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("Done"));
    }

    #[test]
    fn test_page_response_clears_flash() {
        let templates = PageTemplates::new().unwrap();
        let flash = IncomingFlash(Some(FlashMessage::success("Saved")));
        let current = user();

        let response = Page::new("change_email.html", Some(&current), flash)
            .with("form", &serde_json::json!({"new_email": ""}))
            .with("errors", &FormErrors::new().to_context(&["new_email"]))
            .render(&templates)
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].to_str().unwrap().starts_with("flash=;"));
    }
}
