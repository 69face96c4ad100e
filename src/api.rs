use std::cell::RefCell;
use std::rc::Rc;

use campusvoice_shared::protocol::{
    ApiRequest, DeleteComplaintRequest, LikeComplaintRequest, ListAdminComplaintsRequest,
    ListApprovedRequest, ListComplaintsRequest, UnlikeComplaintRequest, UpdateComplaintCall,
};
use campusvoice_shared::{
    Complaint, ComplaintStatus, CreateComplaintRequest, HEADER_AUTHORIZATION, StatusFilter,
    UpdateComplaintRequest,
};

use crate::auth::SessionCore;
use crate::error::{ApiError, ApiErrorKind, ApiFailure, ApiResult};
use crate::web::http::{HttpClient, HttpRequest};
use crate::web::route::{AppRoute, Location};
use crate::web::router::Router;

// =========================================================
// 网关：所有请求的唯一拦截点
// =========================================================

/// 401 强制跳转的执行者
///
/// 未安装时网关直接推入路由器。
pub type RedirectHook = Rc<dyn Fn(Location)>;

struct GatewayInner {
    http: Rc<dyn HttpClient>,
    base_url: String,
    session: Rc<SessionCore>,
    router: Router,
    redirect: RefCell<Option<RedirectHook>>,
}

/// API 网关
///
/// 负责拼接 URL、附带凭据、编码请求体、解码响应，
/// 并把每一次失败归一化为 `ApiError`。
/// 401 时额外重置会话，并在必要时强制跳转到登录页。
#[derive(Clone)]
pub struct ApiGateway {
    inner: Rc<GatewayInner>,
}

impl ApiGateway {
    pub fn new(
        http: Rc<dyn HttpClient>,
        base_url: &str,
        session: Rc<SessionCore>,
        router: Router,
    ) -> Self {
        Self {
            inner: Rc::new(GatewayInner {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                session,
                router,
                redirect: RefCell::new(None),
            }),
        }
    }

    /// 安装强制跳转的执行者（`App` 用它在跳转时关闭当前视图）
    pub fn set_redirect_hook(&self, hook: impl Fn(Location) + 'static) {
        *self.inner.redirect.borrow_mut() = Some(Rc::new(hook));
    }

    fn url(&self, path: &str, query: &[(&'static str, String)]) -> String {
        let mut url = if path.starts_with('/') {
            format!("{}{}", self.inner.base_url, path)
        } else {
            format!("{}/{}", self.inner.base_url, path)
        };
        if !query.is_empty() {
            let pairs: Vec<String> = query.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            url.push('?');
            url.push_str(&pairs.join("&"));
        }
        url
    }

    /// 发出一次调用（无重试）
    pub async fn call<R: ApiRequest>(&self, req: &R) -> ApiResult<R::Response> {
        let url = self.url(&req.path(), &req.query());
        let mut http_req =
            HttpRequest::new(&url, R::METHOD).with_header("Accept", "application/json");

        if let Some(token) = self.inner.session.token() {
            http_req = http_req.with_header(HEADER_AUTHORIZATION, &format!("Bearer {}", token));
        }

        if let Some(body) = req.body() {
            let json = serde_json::to_string(body).map_err(|e| {
                tracing::warn!(error = %e, url = %url, "failed to encode request body");
                ApiError::new(ApiErrorKind::Decode, 0, "Request could not be encoded.")
            })?;
            http_req = http_req
                .with_header("Content-Type", "application/json")
                .with_body(json);
        }

        tracing::debug!(method = R::METHOD.as_str(), url = %url, "api request");

        let resp = match self.inner.http.send(http_req).await {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(method = R::METHOD.as_str(), url = %url, error = %e, "transport failure");
                return Err(ApiError::from_failure(&ApiFailure::from_transport(&e)));
            }
        };

        if !resp.ok() {
            let failure = ApiFailure::from_response(&resp);
            if failure.status == 401 {
                self.handle_unauthorized(R::AUTH_ENDPOINT, &url);
            }
            let error = ApiError::from_failure(&failure);
            tracing::debug!(status = failure.status, url = %url, message = %error, "api failure");
            return Err(error);
        }

        // 空响应体按 JSON null 解码，`IgnoredAny` 与 `Option<T>` 因此都能接受无内容的 2xx
        let raw = if resp.body.trim().is_empty() {
            "null"
        } else {
            resp.body.as_str()
        };
        serde_json::from_str::<R::Response>(raw).map_err(|e| {
            tracing::warn!(status = resp.status, url = %url, error = %e, "undecodable response");
            ApiError::decode(resp.status)
        })
    }

    /// 401：全局重置会话
    ///
    /// 认证端点自身的失败、或已在登录页时不跳转，
    /// 避免重定向循环，也不打断登录/注册表单自己的错误处理。
    fn handle_unauthorized(&self, auth_endpoint: bool, url: &str) {
        tracing::warn!(url, "unauthorized response, resetting session");
        self.inner.session.reset();

        if auth_endpoint || self.inner.router.current_route() == AppRoute::Login {
            return;
        }
        let target = Location::new(AppRoute::auth_failure_redirect());
        let hook = self.inner.redirect.borrow().clone();
        match hook {
            Some(hook) => hook(target),
            None => self.inner.router.push(target),
        }
    }
}

// =========================================================
// 投诉查询/变更客户端
// =========================================================

/// 投诉客户端
///
/// 每个操作恰好一次远端调用，无重试、无本地缓存；失败原样交给调用方。
#[derive(Clone)]
pub struct ComplaintClient {
    gateway: ApiGateway,
}

impl ComplaintClient {
    pub fn new(gateway: ApiGateway) -> Self {
        Self { gateway }
    }

    /// 获取投诉列表
    pub async fn list_complaints(&self, filter: StatusFilter) -> ApiResult<Vec<Complaint>> {
        self.gateway.call(&ListComplaintsRequest { filter }).await
    }

    /// 获取已批准的投诉（专用端点）
    pub async fn list_approved(&self) -> ApiResult<Vec<Complaint>> {
        self.gateway.call(&ListApprovedRequest).await
    }

    /// 获取管理员视角的投诉列表
    pub async fn list_admin_complaints(&self, filter: StatusFilter) -> ApiResult<Vec<Complaint>> {
        self.gateway.call(&ListAdminComplaintsRequest { filter }).await
    }

    pub async fn create_complaint(&self, description: &str) -> ApiResult<Complaint> {
        let req = CreateComplaintRequest {
            description: description.to_string(),
        };
        self.gateway.call(&req).await
    }

    /// 更新状态；带评论时由服务端以当前管理员身份追加
    pub async fn update_complaint_status(
        &self,
        id: &str,
        status: ComplaintStatus,
        comment: Option<&str>,
    ) -> ApiResult<Complaint> {
        let call = UpdateComplaintCall {
            id: id.to_string(),
            update: UpdateComplaintRequest {
                status,
                comment: comment.map(str::to_string),
            },
        };
        self.gateway.call(&call).await
    }

    pub async fn like_complaint(&self, id: &str) -> ApiResult<()> {
        self.gateway
            .call(&LikeComplaintRequest { id: id.to_string() })
            .await
            .map(|_| ())
    }

    pub async fn unlike_complaint(&self, id: &str) -> ApiResult<()> {
        self.gateway
            .call(&UnlikeComplaintRequest { id: id.to_string() })
            .await
            .map(|_| ())
    }

    pub async fn delete_complaint(&self, id: &str) -> ApiResult<()> {
        self.gateway
            .call(&DeleteComplaintRequest { id: id.to_string() })
            .await
            .map(|_| ())
    }
}
