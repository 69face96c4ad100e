//! 应用上下文
//!
//! `App` 在启动时构造一次，持有配置、路由器、会话和投诉客户端，
//! 并负责带守卫的导航。页面控制器都从这里创建。

use std::cell::RefCell;
use std::rc::Rc;

use crate::api::{ApiGateway, ComplaintClient};
use crate::auth::{SessionCore, SessionStore};
use crate::config::ClientConfig;
use crate::guard::{self, GuardOutcome, landing_route};
use crate::pages::{
    AdminComplaintsPage, CommunityPage, ComplaintsPage, LoginPage, ProfilePage, RegisterPage,
    ViewScope,
};
use crate::web::http::HttpClient;
use crate::web::route::{AppRoute, Location};
use crate::web::router::Router;
use crate::web::storage::KeyValueStore;

pub struct App {
    pub config: ClientConfig,
    pub router: Router,
    pub session: SessionStore,
    pub complaints: ComplaintClient,
    /// 当前视图的作用域；每次导航（包括 401 强制跳转）都会关闭旧的、打开新的
    scope: Rc<RefCell<ViewScope>>,
}

impl App {
    pub fn new(
        config: ClientConfig,
        http: Rc<dyn HttpClient>,
        storage: Rc<dyn KeyValueStore>,
        initial: Location,
    ) -> Self {
        let router = Router::new(initial);
        let core = Rc::new(SessionCore::new(config.session_mode, storage));
        let gateway = ApiGateway::new(http, &config.api_base_url, core.clone(), router.clone());

        let scope = Rc::new(RefCell::new(ViewScope::new()));
        {
            let router = router.clone();
            let scope = scope.clone();
            gateway.set_redirect_hook(move |location| {
                tracing::debug!(to = %location, "forced navigation");
                router.push(location);
                reopen(&scope);
            });
        }
        let session = SessionStore::new(core, gateway.clone());
        let complaints = ComplaintClient::new(gateway);

        Self {
            config,
            router,
            session,
            complaints,
            scope,
        }
    }

    /// 启动：解析一次身份，然后对初始地址执行守卫
    pub async fn start(&self) -> Location {
        let user = self.session.resolve_current_user().await;
        tracing::debug!(authenticated = user.is_some(), "startup identity resolved");

        let target = self.guarded(self.router.current()).await;
        self.router.replace(target.clone());
        self.open_scope();
        target
    }

    /// 导航到 URL（带守卫）
    pub async fn navigate(&self, url: &str) -> Location {
        self.navigate_to(Location::parse(url)).await
    }

    pub async fn navigate_to(&self, location: Location) -> Location {
        let target = self.guarded(location.clone()).await;
        if target != location {
            tracing::debug!(from = %location, to = %target, "navigation redirected");
        }
        self.router.push(target.clone());
        self.open_scope();
        target
    }

    /// 注销后回到登录页
    pub async fn logout(&self) -> Location {
        self.session.logout().await;
        self.navigate_to(Location::new(AppRoute::Login)).await
    }

    /// 求出守卫之后真正落地的地址
    async fn guarded(&self, location: Location) -> Location {
        match guard::evaluate(location.route, &self.session).await {
            GuardOutcome::Allow => location,
            GuardOutcome::Redirect(route) => Location::new(route),
            GuardOutcome::Deny => {
                let fallback = self
                    .session
                    .role()
                    .map(landing_route)
                    .unwrap_or_else(AppRoute::auth_failure_redirect);
                Location::new(fallback)
            }
        }
    }

    fn open_scope(&self) {
        reopen(&self.scope);
    }

    pub fn view_scope(&self) -> ViewScope {
        self.scope.borrow().clone()
    }

    // ---- 页面控制器 ----

    pub fn complaints_page(&self) -> ComplaintsPage {
        ComplaintsPage::new(
            self.complaints.clone(),
            self.session.clone(),
            self.router.clone(),
            self.view_scope(),
        )
    }

    pub fn admin_complaints_page(&self) -> AdminComplaintsPage {
        AdminComplaintsPage::new(
            self.complaints.clone(),
            self.session.clone(),
            self.router.clone(),
            self.view_scope(),
        )
    }

    pub fn community_page(&self) -> CommunityPage {
        CommunityPage::new(
            self.complaints.clone(),
            self.session.clone(),
            self.view_scope(),
        )
    }

    pub fn login_page(&self) -> LoginPage {
        LoginPage::new(self.session.clone(), self.router.clone())
    }

    pub fn register_page(&self) -> RegisterPage {
        RegisterPage::new(self.session.clone(), self.router.clone())
    }

    pub fn profile_page(&self) -> ProfilePage {
        ProfilePage::new(self.session.clone())
    }
}

fn reopen(scope: &RefCell<ViewScope>) {
    let mut scope = scope.borrow_mut();
    scope.close();
    *scope = ViewScope::new();
}
