//! 个人资料表单

use std::cell::{Cell, RefCell};

use campusvoice_shared::{UpdateProfileRequest, User};

use crate::auth::SessionStore;
use crate::validation::validate_profile;

pub struct ProfilePage {
    session: SessionStore,
    form: RefCell<UpdateProfileRequest>,
    saving: Cell<bool>,
    saved: Cell<bool>,
    error: RefCell<Option<String>>,
}

fn seed(user: Option<&User>) -> UpdateProfileRequest {
    UpdateProfileRequest {
        name: user.and_then(|u| u.name.clone()).unwrap_or_default(),
        username: user.and_then(|u| u.username.clone()).unwrap_or_default(),
    }
}

impl ProfilePage {
    /// 表单以当前会话用户为初值
    pub fn new(session: SessionStore) -> Self {
        let form = seed(session.current_user().as_ref());
        Self {
            session,
            form: RefCell::new(form),
            saving: Cell::new(false),
            saved: Cell::new(false),
            error: RefCell::new(None),
        }
    }

    pub fn name(&self) -> String {
        self.form.borrow().name.clone()
    }

    pub fn username(&self) -> String {
        self.form.borrow().username.clone()
    }

    pub fn set_name(&self, name: &str) {
        self.form.borrow_mut().name = name.to_string();
        self.saved.set(false);
    }

    pub fn set_username(&self, username: &str) {
        self.form.borrow_mut().username = username.to_string();
        self.saved.set(false);
    }

    pub fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn saved(&self) -> bool {
        self.saved.get()
    }

    /// 保存；成功后会话身份与表单都换成服务端返回的版本
    pub async fn save(&self) -> Option<User> {
        if self.saving.get() {
            return None;
        }

        let fields = {
            let form = self.form.borrow();
            UpdateProfileRequest {
                name: form.name.trim().to_string(),
                username: form.username.trim().to_string(),
            }
        };
        if let Err(e) = validate_profile(&fields) {
            *self.error.borrow_mut() = Some(e.to_string());
            return None;
        }

        self.saving.set(true);
        self.saved.set(false);
        *self.error.borrow_mut() = None;
        let result = self.session.update_profile(fields).await;
        self.saving.set(false);

        match result {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "profile updated");
                *self.form.borrow_mut() = seed(Some(&user));
                self.saved.set(true);
                Some(user)
            }
            Err(e) => {
                *self.error.borrow_mut() = Some(e.message);
                None
            }
        }
    }
}
