//! 登录表单

use std::cell::{Cell, RefCell};

use campusvoice_shared::{LoginRequest, User};

use crate::auth::SessionStore;
use crate::guard::landing_route;
use crate::validation::validate_login;
use crate::web::route::Location;
use crate::web::router::Router;

pub struct LoginPage {
    session: SessionStore,
    router: Router,
    form: RefCell<LoginRequest>,
    submitting: Cell<bool>,
    error: RefCell<Option<String>>,
}

impl LoginPage {
    pub fn new(session: SessionStore, router: Router) -> Self {
        Self {
            session,
            router,
            form: RefCell::new(LoginRequest {
                email: String::new(),
                password: String::new(),
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

    pub fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.get()
    }

    /// 提交登录；成功后跳转到角色落地页
    pub async fn submit(&self) -> Option<User> {
        if self.submitting.get() {
            return None;
        }

        let credentials = {
            let form = self.form.borrow();
            LoginRequest {
                email: form.email.trim().to_string(),
                password: form.password.clone(),
            }
        };
        if let Err(e) = validate_login(&credentials) {
            *self.error.borrow_mut() = Some(e.to_string());
            return None;
        }

        self.submitting.set(true);
        *self.error.borrow_mut() = None;
        let result = self.session.login(credentials).await;
        self.submitting.set(false);

        match result {
            Ok(user) => {
                self.router.push(Location::new(landing_route(user.role)));
                Some(user)
            }
            Err(e) => {
                *self.error.borrow_mut() = Some(e.message);
                None
            }
        }
    }
}
