//! 路由守卫
//!
//! 进入受保护视图前求值的谓词。除了给出重定向目标之外没有副作用；
//! 真正的导航由 `App::navigate` 完成。

use campusvoice_shared::UserRole;

use crate::auth::SessionStore;
use crate::web::route::AppRoute;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    Redirect(AppRoute),
    /// 拒绝但不指定去向；由组合方决定落地页
    Deny,
}

/// 角色落地页
pub fn landing_route(role: UserRole) -> AppRoute {
    match role {
        UserRole::Admin => AppRoute::AdminComplaints,
        UserRole::Student => AppRoute::Complaints,
    }
}

/// 需要认证：已缓存直接放行，否则等待身份解析
pub async fn require_authenticated(session: &SessionStore) -> GuardOutcome {
    if session.is_authenticated() {
        return GuardOutcome::Allow;
    }
    match session.resolve_current_user().await {
        Some(_) => GuardOutcome::Allow,
        None => GuardOutcome::Redirect(AppRoute::auth_failure_redirect()),
    }
}

/// 需要管理员：同步检查，必须在认证守卫完成之后求值
pub fn require_admin(session: &SessionStore) -> GuardOutcome {
    if session.is_admin() {
        GuardOutcome::Allow
    } else {
        GuardOutcome::Deny
    }
}

/// 仅限访客：已认证（或解析后认证）的用户被送回角色落地页
pub async fn guest_only(session: &SessionStore) -> GuardOutcome {
    let user = match session.current_user() {
        Some(user) => Some(user),
        None => session.resolve_current_user().await,
    };
    match user {
        Some(user) => GuardOutcome::Redirect(landing_route(user.role)),
        None => GuardOutcome::Allow,
    }
}

/// 按路由属性组合守卫
///
/// 顺序固定：认证守卫（含异步解析）先完成，管理员守卫再做同步的角色检查，
/// 避免冷启动时的误判。
pub async fn evaluate(route: AppRoute, session: &SessionStore) -> GuardOutcome {
    if route.guest_only() {
        return guest_only(session).await;
    }

    if route.requires_auth() {
        let outcome = require_authenticated(session).await;
        if outcome != GuardOutcome::Allow {
            return outcome;
        }
    }

    if route.requires_admin() {
        return require_admin(session);
    }

    GuardOutcome::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestApp, admin_json, student_json};
    use crate::web::http::MockReply;
    use campusvoice_shared::protocol::HttpMethod;

    #[tokio::test]
    async fn test_authenticated_guard_uses_cached_identity() {
        let t = TestApp::with_student();
        assert_eq!(
            require_authenticated(&t.app.session).await,
            GuardOutcome::Allow
        );
        assert_eq!(t.http.requests.borrow().len(), 0);
    }

    #[tokio::test]
    async fn test_authenticated_guard_redirects_when_resolution_fails() {
        let t = TestApp::cookie();
        t.http
            .mock(HttpMethod::Get, &t.url("/users/me"), MockReply::empty(401));
        assert_eq!(
            require_authenticated(&t.app.session).await,
            GuardOutcome::Redirect(AppRoute::Login)
        );
    }

    #[tokio::test]
    async fn test_admin_guard_after_cold_resolution() {
        let t = TestApp::cookie();
        t.http
            .mock_json(HttpMethod::Get, &t.url("/users/me"), 200, admin_json());

        // 冷启动：身份尚未缓存，同步检查会误判
        assert_eq!(require_admin(&t.app.session), GuardOutcome::Deny);
        assert_eq!(
            evaluate(AppRoute::AdminComplaints, &t.app.session).await,
            GuardOutcome::Allow
        );
    }

    #[tokio::test]
    async fn test_admin_guard_denies_student() {
        let t = TestApp::cookie();
        t.http
            .mock_json(HttpMethod::Get, &t.url("/users/me"), 200, student_json());
        assert_eq!(
            evaluate(AppRoute::AdminComplaints, &t.app.session).await,
            GuardOutcome::Deny
        );
    }

    #[tokio::test]
    async fn test_guest_guard_sends_users_to_role_landing() {
        let t = TestApp::with_admin();
        assert_eq!(
            evaluate(AppRoute::Login, &t.app.session).await,
            GuardOutcome::Redirect(AppRoute::AdminComplaints)
        );

        let t = TestApp::with_student();
        assert_eq!(
            evaluate(AppRoute::Register, &t.app.session).await,
            GuardOutcome::Redirect(AppRoute::Complaints)
        );
    }

    #[tokio::test]
    async fn test_guest_guard_allows_anonymous() {
        let t = TestApp::token();
        assert_eq!(
            evaluate(AppRoute::Login, &t.app.session).await,
            GuardOutcome::Allow
        );
        // Token 模式下没有 token，不发 "who am I"
        assert_eq!(t.http.requests.borrow().len(), 0);
    }

    #[test]
    fn test_landing_routes() {
        assert_eq!(landing_route(UserRole::Admin), AppRoute::AdminComplaints);
        assert_eq!(landing_route(UserRole::Student), AppRoute::Complaints);
    }
}
