//! 测试夹具：用户、投诉 JSON，以及接好 Mock 传输层的 `App`

use std::rc::Rc;

use campusvoice_shared::User;
use serde_json::{Value, json};

use crate::app::App;
use crate::auth::{STORAGE_TOKEN_KEY, STORAGE_USER_KEY};
use crate::config::{ClientConfig, SessionMode};
use crate::web::http::{HttpClient, MockHttpClient};
use crate::web::route::Location;
use crate::web::storage::{KeyValueStore, MemoryStore};

pub const BASE_URL: &str = "http://api.test";

pub fn student_json() -> Value {
    json!({
        "id": "u1",
        "email": "alice@campus.edu",
        "name": "Alice",
        "username": "alice",
        "role": "student"
    })
}

pub fn other_student_json() -> Value {
    json!({
        "id": "u2",
        "email": "bob@campus.edu",
        "username": "bob",
        "role": "student"
    })
}

pub fn admin_json() -> Value {
    json!({
        "id": "a1",
        "email": "dean@campus.edu",
        "name": "Dean",
        "role": "admin"
    })
}

pub fn user(value: Value) -> User {
    serde_json::from_value(value).unwrap()
}

pub fn complaint_json(id: &str, user_id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "description": format!("Complaint {} about the library wifi", id),
        "status": status,
        "createdAt": "2024-03-01T10:00:00Z",
        "userId": user_id,
        "comments": []
    })
}

pub fn liked_complaint_json(id: &str, user_id: &str, likes: u32) -> Value {
    let mut value = complaint_json(id, user_id, "approved");
    value["likeCount"] = json!(likes);
    value
}

pub struct TestApp {
    pub http: Rc<MockHttpClient>,
    pub storage: Rc<MemoryStore>,
    pub app: App,
}

impl TestApp {
    pub fn build(mode: SessionMode, storage: Rc<MemoryStore>, initial: &str) -> Self {
        let http = Rc::new(MockHttpClient::new());
        let config = ClientConfig {
            api_base_url: BASE_URL.to_string(),
            session_mode: mode,
            ..ClientConfig::default()
        };
        let app = App::new(
            config,
            http.clone() as Rc<dyn HttpClient>,
            storage.clone() as Rc<dyn KeyValueStore>,
            Location::parse(initial),
        );
        Self { http, storage, app }
    }

    /// Cookie 会话，未登录
    pub fn cookie() -> Self {
        Self::build(SessionMode::Cookie, Rc::new(MemoryStore::new()), "/complaints")
    }

    /// Token 会话，存储为空
    pub fn token() -> Self {
        Self::token_at("/complaints")
    }

    pub fn token_at(initial: &str) -> Self {
        Self::build(SessionMode::Token, Rc::new(MemoryStore::new()), initial)
    }

    /// Token 会话，启动时从存储恢复出给定用户
    pub fn signed_in(user: Value, initial: &str) -> Self {
        let storage = Rc::new(MemoryStore::new());
        let token = format!("t-{}", user["id"].as_str().unwrap_or("user"));
        storage.set(STORAGE_TOKEN_KEY, &token);
        storage.set(STORAGE_USER_KEY, &user.to_string());
        Self::build(SessionMode::Token, storage, initial)
    }

    pub fn with_student() -> Self {
        Self::signed_in(student_json(), "/complaints")
    }

    pub fn with_admin() -> Self {
        Self::signed_in(admin_json(), "/admin/complaints")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", BASE_URL, path)
    }
}
