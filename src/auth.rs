//! 认证模块
//!
//! 会话状态的唯一事实来源："我登录了吗 / 我是管理员吗"。
//!
//! - `SessionCore`: 身份状态本身，和 `ApiGateway` 共享（401 时由网关重置）
//! - `SessionStore`: 对外的会话操作（解析身份、登录、注册、注销、资料更新）
//!
//! 并发约束：同一时刻最多一个 "who am I" 请求在途，
//! 所有并发调用者共享同一个结果（`futures::future::Shared`）。

use std::cell::RefCell;
use std::rc::Rc;

use campusvoice_shared::protocol::{CurrentUserRequest, LogoutRequest};
use campusvoice_shared::{
    AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest, User, UserRole,
};
use futures::FutureExt;
use futures::future::{LocalBoxFuture, Shared};

use crate::api::ApiGateway;
use crate::config::SessionMode;
use crate::error::{ApiError, ApiResult};
use crate::web::storage::KeyValueStore;

pub const STORAGE_TOKEN_KEY: &str = "campusvoice.token";
pub const STORAGE_USER_KEY: &str = "campusvoice.user";

/// 会话阶段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    /// 尚未尝试解析身份
    Unknown,
    /// "who am I" 请求在途
    Resolving,
    Authenticated(User),
    Anonymous,
}

// =========================================================
// 身份状态 (SessionCore)
// =========================================================

#[derive(Default)]
struct SessionState {
    user: Option<User>,
    token: Option<String>,
    resolving: bool,
    /// 至少完成过一次解析或显式的登录/登出
    settled: bool,
    /// 每次建立或清除会话时递增；解析结果只在纪元未变时生效
    epoch: u64,
}

pub struct SessionCore {
    state: RefCell<SessionState>,
    storage: Rc<dyn KeyValueStore>,
    mode: SessionMode,
}

impl SessionCore {
    /// 创建身份状态；Token 模式下从持久化存储恢复 token 和用户
    pub fn new(mode: SessionMode, storage: Rc<dyn KeyValueStore>) -> Self {
        let mut state = SessionState::default();

        if mode.persists_identity() {
            state.token = storage.get(STORAGE_TOKEN_KEY).filter(|t| !t.trim().is_empty());
            let user = storage
                .get(STORAGE_USER_KEY)
                .and_then(|raw| serde_json::from_str::<User>(&raw).ok());

            match (&state.token, user) {
                (Some(_), Some(user)) => {
                    tracing::debug!(user_id = %user.id, "restored persisted session");
                    state.user = Some(user);
                    state.settled = true;
                }
                (Some(_), None) => {
                    // token 还在但用户记录缺失或损坏，留给下一次解析
                    storage.delete(STORAGE_USER_KEY);
                }
                (None, _) => {
                    storage.delete(STORAGE_USER_KEY);
                }
            }
        }

        Self {
            state: RefCell::new(state),
            storage,
            mode,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    pub fn phase(&self) -> SessionPhase {
        let state = self.state.borrow();
        match (&state.user, state.resolving, state.settled) {
            (Some(user), _, _) => SessionPhase::Authenticated(user.clone()),
            (None, true, _) => SessionPhase::Resolving,
            (None, false, true) => SessionPhase::Anonymous,
            (None, false, false) => SessionPhase::Unknown,
        }
    }

    /// 没有可用凭据时不发请求（Token 模式下无 token）
    fn can_resolve(&self) -> bool {
        match self.mode {
            SessionMode::Cookie => true,
            SessionMode::Token => self.state.borrow().token.is_some(),
        }
    }

    fn settle_anonymous(&self) {
        self.state.borrow_mut().settled = true;
    }

    fn begin_resolving(&self) -> u64 {
        let mut state = self.state.borrow_mut();
        state.resolving = true;
        state.epoch
    }

    /// 应用一次 "who am I" 的结果
    fn finish_resolving(&self, epoch: u64, result: ApiResult<User>) -> Option<User> {
        let mut state = self.state.borrow_mut();
        state.resolving = false;

        if state.epoch != epoch {
            // 期间发生了登录/登出/重置，以当前状态为准
            return state.user.clone();
        }

        state.settled = true;
        match result {
            Ok(user) => {
                if self.mode.persists_identity() {
                    self.persist_user(&user);
                }
                state.user = Some(user.clone());
                Some(user)
            }
            Err(e) => {
                tracing::debug!(error = %e, "identity resolution failed");
                state.user = None;
                None
            }
        }
    }

    /// 建立会话：写入身份，Token 模式下同时持久化
    fn establish(&self, user: User, token: Option<String>) {
        let mut state = self.state.borrow_mut();
        state.epoch += 1;
        state.settled = true;

        if self.mode.persists_identity() {
            if let Some(token) = &token {
                self.storage.set(STORAGE_TOKEN_KEY, token);
            }
            self.persist_user(&user);
        }

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "session established");
        state.user = Some(user);
        if token.is_some() {
            state.token = token;
        }
    }

    /// 用服务端返回的用户替换缓存身份（会话期间未被重置时）
    fn replace_user(&self, epoch: u64, user: User) {
        let mut state = self.state.borrow_mut();
        if state.epoch != epoch || state.user.is_none() {
            return;
        }
        if self.mode.persists_identity() {
            self.persist_user(&user);
        }
        state.user = Some(user);
    }

    /// 同步、幂等地清除身份与持久化状态
    pub fn reset(&self) {
        let mut state = self.state.borrow_mut();
        if state.user.is_some() || state.token.is_some() {
            tracing::info!("session reset");
        }
        state.user = None;
        state.token = None;
        state.settled = true;
        state.epoch += 1;

        if self.mode.persists_identity() {
            self.storage.delete(STORAGE_TOKEN_KEY);
            self.storage.delete(STORAGE_USER_KEY);
        }
    }

    fn persist_user(&self, user: &User) {
        match serde_json::to_string(user) {
            Ok(raw) => {
                self.storage.set(STORAGE_USER_KEY, &raw);
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize user record"),
        }
    }
}

// =========================================================
// 会话操作 (SessionStore)
// =========================================================

type IdentityFuture = Shared<LocalBoxFuture<'static, Option<User>>>;

/// 会话上下文
///
/// 廉价克隆；所有克隆共享身份状态和在途的身份解析。
#[derive(Clone)]
pub struct SessionStore {
    core: Rc<SessionCore>,
    gateway: ApiGateway,
    pending: Rc<RefCell<Option<IdentityFuture>>>,
}

impl SessionStore {
    pub fn new(core: Rc<SessionCore>, gateway: ApiGateway) -> Self {
        Self {
            core,
            gateway,
            pending: Rc::new(RefCell::new(None)),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.core.user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.core.user().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(UserRole::Admin)
    }

    pub fn role(&self) -> Option<UserRole> {
        self.core.user().map(|u| u.role)
    }

    pub fn phase(&self) -> SessionPhase {
        self.core.phase()
    }

    pub fn mode(&self) -> SessionMode {
        self.core.mode()
    }

    /// 解析当前身份
    ///
    /// - 已缓存：立即返回
    /// - 已有解析在途：共享同一个结果
    /// - 否则发起 "who am I"；失败时清除身份并返回 `None`（不向调用方暴露传输错误）
    pub async fn resolve_current_user(&self) -> Option<User> {
        if let Some(user) = self.core.user() {
            return Some(user);
        }

        let fut = {
            let mut pending = self.pending.borrow_mut();
            match pending.as_ref() {
                Some(fut) => fut.clone(),
                None => {
                    if !self.core.can_resolve() {
                        self.core.settle_anonymous();
                        return None;
                    }
                    let fut = self.start_resolution();
                    *pending = Some(fut.clone());
                    fut
                }
            }
        };

        let user = fut.clone().await;

        let mut pending = self.pending.borrow_mut();
        if pending.as_ref().is_some_and(|p| p.ptr_eq(&fut)) {
            *pending = None;
        }
        user
    }

    fn start_resolution(&self) -> IdentityFuture {
        let core = self.core.clone();
        let gateway = self.gateway.clone();
        let epoch = core.begin_resolving();
        tracing::debug!("resolving current user");

        async move {
            let result = gateway.call(&CurrentUserRequest).await;
            core.finish_resolving(epoch, result)
        }
        .boxed_local()
        .shared()
    }

    /// 登录；成功即建立会话
    pub async fn login(&self, credentials: LoginRequest) -> ApiResult<User> {
        tracing::debug!(email = %credentials.email, "login");
        let response = self.gateway.call(&credentials).await?;
        self.establish(response).await
    }

    /// 注册；成功即自动登录
    pub async fn register(&self, details: RegisterRequest) -> ApiResult<User> {
        tracing::debug!(email = %details.email, "register");
        let response = self.gateway.call(&details).await?;
        self.establish(response).await
    }

    async fn establish(&self, response: Option<AuthResponse>) -> ApiResult<User> {
        match response {
            Some(AuthResponse { token, user }) => {
                self.core.establish(user.clone(), Some(token));
                Ok(user)
            }
            None => match self.core.mode() {
                SessionMode::Token => Err(ApiError::decode(200)),
                SessionMode::Cookie => {
                    // cookie 已由服务端下发，用 "who am I" 确认身份
                    let user = self.gateway.call(&CurrentUserRequest).await?;
                    self.core.establish(user.clone(), None);
                    Ok(user)
                }
            },
        }
    }

    /// 注销
    ///
    /// 服务端注销是尽力而为的；无论网络调用成败，本地身份和持久化状态都会被清除。
    pub async fn logout(&self) {
        if let Err(e) = self.gateway.call(&LogoutRequest).await {
            tracing::warn!(error = %e, "server logout failed, clearing local session anyway");
        }
        self.reset_session();
    }

    /// 更新资料；成功后以服务端返回的用户为准
    pub async fn update_profile(&self, fields: UpdateProfileRequest) -> ApiResult<User> {
        let epoch = self.core.epoch();
        let user = self.gateway.call(&fields).await?;
        self.core.replace_user(epoch, user.clone());
        Ok(user)
    }

    /// 同步、幂等、无网络调用的会话清除
    pub fn reset_session(&self) {
        self.core.reset();
    }
}
