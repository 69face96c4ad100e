//! 注册表单：成功即登录，跳转到 `/complaints`

use std::cell::{Cell, RefCell};

use campusvoice_shared::{RegisterRequest, User};

use crate::auth::SessionStore;
use crate::validation::validate_register;
use crate::web::route::{AppRoute, Location};
use crate::web::router::Router;

pub struct RegisterPage {
    session: SessionStore,
    router: Router,
    form: RefCell<RegisterRequest>,
    submitting: Cell<bool>,
    error: RefCell<Option<String>>,
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl RegisterPage {
    pub fn new(session: SessionStore, router: Router) -> Self {
        Self {
            session,
            router,
            form: RefCell::new(RegisterRequest {
                email: String::new(),
                password: String::new(),
                name: None,
                username: None,
            }),
            submitting: Cell::new(false),
            error: RefCell::new(None),
        }
    }

    pub fn set_email(&self, email: &str) {
        self.form.borrow_mut().email = email.to_string();
    }

    pub fn set_password(&self, password: &str) {
        self.form.borrow_mut().password = password.to_string();
    }

    pub fn set_name(&self, name: &str) {
        self.form.borrow_mut().name = optional(name);
    }

    pub fn set_username(&self, username: &str) {
        self.form.borrow_mut().username = optional(username);
    }

    pub fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub async fn submit(&self) -> Option<User> {
        if self.submitting.get() {
            return None;
        }

        let details = {
            let form = self.form.borrow();
            RegisterRequest {
                email: form.email.trim().to_string(),
                ..form.clone()
            }
        };
        if let Err(e) = validate_register(&details) {
            *self.error.borrow_mut() = Some(e.to_string());
            return None;
        }

        self.submitting.set(true);
        *self.error.borrow_mut() = None;
        let result = self.session.register(details).await;
        self.submitting.set(false);

        match result {
            Ok(user) => {
                self.router.push(Location::new(AppRoute::Complaints));
                Some(user)
            }
            Err(e) => {
                *self.error.borrow_mut() = Some(e.message);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestApp, student_json};
    use campusvoice_shared::protocol::HttpMethod;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_register_signs_in_and_omits_blank_fields() {
        let t = TestApp::token();
        t.http.mock_json(
            HttpMethod::Post,
            &t.url("/auth/register"),
            201,
            json!({"token": "t-new", "user": student_json()}),
        );

        let page = t.app.register_page();
        page.set_email("alice@campus.edu");
        page.set_password("secret1");
        page.set_name("  ");
        page.set_username(" alice ");
        let user = page.submit().await.unwrap();

        assert_eq!(user.id, "u1");
        assert!(t.app.session.is_authenticated());
        assert_eq!(t.app.router.current_url(), "/complaints");

        let body: Value =
            serde_json::from_str(t.http.requests.borrow()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"email": "alice@campus.edu", "password": "secret1", "username": "alice"})
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_message_surfaces() {
        let t = TestApp::token();
        t.http.mock_json(
            HttpMethod::Post,
            &t.url("/auth/register"),
            409,
            json!({"message": "Email already registered"}),
        );
        let page = t.app.register_page();
        page.set_email("alice@campus.edu");
        page.set_password("secret1");
        assert!(page.submit().await.is_none());
        assert_eq!(page.error().as_deref(), Some("Email already registered"));
        assert!(!t.app.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_short_password_is_rejected_locally() {
        let t = TestApp::token();
        let page = t.app.register_page();
        page.set_email("alice@campus.edu");
        page.set_password("123");
        assert!(page.submit().await.is_none());
        assert_eq!(
            page.error().as_deref(),
            Some("Password must be at least 6 characters.")
        );
        assert!(t.http.requests.borrow().is_empty());
    }
}
