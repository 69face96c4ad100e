use crate::{
    AuthResponse, Complaint, CreateComplaintRequest, LoginRequest, QUERY_STATUS, RegisterRequest,
    StatusFilter, UpdateComplaintRequest, UpdateProfileRequest, User,
};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A trait that defines the request-response relationship and metadata for an API endpoint.
///
/// Paths are relative to the configured API base URL.
/// Endpoints that only signal success with a 2xx use `IgnoredAny` so any body is accepted.
pub trait ApiRequest {
    /// JSON body type. Endpoints without a body use `()`.
    type Body: Serialize;
    /// The response type returned by this request. An empty 2xx body decodes as JSON `null`.
    type Response: DeserializeOwned;
    /// The HTTP method.
    const METHOD: HttpMethod;
    /// Authentication endpoints never trigger the global redirect to the login view on 401.
    const AUTH_ENDPOINT: bool = false;

    fn path(&self) -> String;

    fn query(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn body(&self) -> Option<&Self::Body> {
        None
    }
}

// =========================================================
// Auth & Profile
// =========================================================

impl ApiRequest for LoginRequest {
    type Body = LoginRequest;
    /// `None` when the server establishes a cookie session and returns no body.
    type Response = Option<AuthResponse>;
    const METHOD: HttpMethod = HttpMethod::Post;
    const AUTH_ENDPOINT: bool = true;

    fn path(&self) -> String {
        "/auth/login".to_string()
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(self)
    }
}

impl ApiRequest for RegisterRequest {
    type Body = RegisterRequest;
    type Response = Option<AuthResponse>;
    const METHOD: HttpMethod = HttpMethod::Post;
    const AUTH_ENDPOINT: bool = true;

    fn path(&self) -> String {
        "/auth/register".to_string()
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(self)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogoutRequest;

impl ApiRequest for LogoutRequest {
    type Body = ();
    type Response = IgnoredAny;
    const METHOD: HttpMethod = HttpMethod::Post;
    const AUTH_ENDPOINT: bool = true;

    fn path(&self) -> String {
        "/auth/logout".to_string()
    }
}

/// "Who am I"
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentUserRequest;

impl ApiRequest for CurrentUserRequest {
    type Body = ();
    type Response = User;
    const METHOD: HttpMethod = HttpMethod::Get;
    const AUTH_ENDPOINT: bool = true;

    fn path(&self) -> String {
        "/users/me".to_string()
    }
}

/// 资料更新与 "who am I" 同属 `/users/me`，401 时不强制跳转，由表单自己报错
impl ApiRequest for UpdateProfileRequest {
    type Body = UpdateProfileRequest;
    type Response = User;
    const METHOD: HttpMethod = HttpMethod::Put;
    const AUTH_ENDPOINT: bool = true;

    fn path(&self) -> String {
        "/users/me".to_string()
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(self)
    }
}

// =========================================================
// Complaints
// =========================================================

/// List complaints, server-side filtered by `?status=`
#[derive(Debug, Clone, Copy, Default)]
pub struct ListComplaintsRequest {
    pub filter: StatusFilter,
}

impl ApiRequest for ListComplaintsRequest {
    type Body = ();
    type Response = Vec<Complaint>;
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        "/complaints".to_string()
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        status_query(self.filter)
    }
}

/// Dedicated approved-complaints endpoint (community view)
#[derive(Debug, Clone, Copy, Default)]
pub struct ListApprovedRequest;

impl ApiRequest for ListApprovedRequest {
    type Body = ();
    type Response = Vec<Complaint>;
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        "/complaints/approved".to_string()
    }
}

/// Admin-scoped listing
#[derive(Debug, Clone, Copy, Default)]
pub struct ListAdminComplaintsRequest {
    pub filter: StatusFilter,
}

impl ApiRequest for ListAdminComplaintsRequest {
    type Body = ();
    type Response = Vec<Complaint>;
    const METHOD: HttpMethod = HttpMethod::Get;

    fn path(&self) -> String {
        "/admin/complaints".to_string()
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        status_query(self.filter)
    }
}

impl ApiRequest for CreateComplaintRequest {
    type Body = CreateComplaintRequest;
    type Response = Complaint;
    const METHOD: HttpMethod = HttpMethod::Post;

    fn path(&self) -> String {
        "/complaints".to_string()
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(self)
    }
}

/// Status change with an optional admin comment
#[derive(Debug, Clone)]
pub struct UpdateComplaintCall {
    pub id: String,
    pub update: UpdateComplaintRequest,
}

impl ApiRequest for UpdateComplaintCall {
    type Body = UpdateComplaintRequest;
    type Response = Complaint;
    const METHOD: HttpMethod = HttpMethod::Put;

    fn path(&self) -> String {
        format!("/complaints/{}", self.id)
    }

    fn body(&self) -> Option<&Self::Body> {
        Some(&self.update)
    }
}

#[derive(Debug, Clone)]
pub struct LikeComplaintRequest {
    pub id: String,
}

impl ApiRequest for LikeComplaintRequest {
    type Body = ();
    type Response = IgnoredAny;
    const METHOD: HttpMethod = HttpMethod::Post;

    fn path(&self) -> String {
        format!("/complaints/{}/like", self.id)
    }
}

#[derive(Debug, Clone)]
pub struct UnlikeComplaintRequest {
    pub id: String,
}

impl ApiRequest for UnlikeComplaintRequest {
    type Body = ();
    type Response = IgnoredAny;
    const METHOD: HttpMethod = HttpMethod::Delete;

    fn path(&self) -> String {
        format!("/complaints/{}/like", self.id)
    }
}

#[derive(Debug, Clone)]
pub struct DeleteComplaintRequest {
    pub id: String,
}

impl ApiRequest for DeleteComplaintRequest {
    type Body = ();
    type Response = IgnoredAny;
    const METHOD: HttpMethod = HttpMethod::Delete;

    fn path(&self) -> String {
        format!("/complaints/{}", self.id)
    }
}

fn status_query(filter: StatusFilter) -> Vec<(&'static str, String)> {
    filter
        .as_query()
        .map(|status| vec![(QUERY_STATUS, status.to_string())])
        .unwrap_or_default()
}
