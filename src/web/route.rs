//! 路由定义模块 - 领域模型
//!
//! 纯粹的业务逻辑层，不依赖具体的导航实现。
//! 定义了应用的所有路由及其守卫属性，以及带查询参数的 `Location`。

use std::collections::BTreeMap;
use std::fmt::Display;

use campusvoice_shared::{QUERY_STATUS, StatusFilter};

/// 应用路由枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AppRoute {
    Login,
    Register,
    /// 我的投诉 (默认路由，需要认证)
    #[default]
    Complaints,
    /// 社区投诉 (需要认证)
    Community,
    /// 个人资料 (需要认证)
    Profile,
    /// 管理后台 (需要认证 + 管理员)
    AdminComplaints,
}

impl AppRoute {
    /// 将 URL path 解析为路由枚举；未知路径返回 `None`
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Some(Self::Complaints),
            "/login" => Some(Self::Login),
            "/register" => Some(Self::Register),
            "/complaints" => Some(Self::Complaints),
            "/community" => Some(Self::Community),
            "/profile" => Some(Self::Profile),
            "/admin/complaints" => Some(Self::AdminComplaints),
            _ => None,
        }
    }

    /// 解析路径，未匹配的路径一律落到 `/complaints`
    pub fn resolve(path: &str) -> Self {
        Self::from_path(path).unwrap_or_default()
    }

    /// 获取路由对应的 URL path
    pub fn to_path(&self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Complaints => "/complaints",
            Self::Community => "/community",
            Self::Profile => "/profile",
            Self::AdminComplaints => "/admin/complaints",
        }
    }

    /// **核心守卫属性：该路由是否需要认证**
    pub fn requires_auth(&self) -> bool {
        match self {
            Self::Complaints | Self::Community | Self::Profile | Self::AdminComplaints => true,
            Self::Login | Self::Register => false,
        }
    }

    /// 是否需要管理员角色（在认证守卫之后求值）
    pub fn requires_admin(&self) -> bool {
        matches!(self, Self::AdminComplaints)
    }

    /// 已认证用户是否应该离开此路由（登录、注册页）
    pub fn guest_only(&self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }

    /// 该视图是否把状态筛选镜像到 `status` 查询参数
    pub fn supports_status_filter(&self) -> bool {
        matches!(self, Self::Complaints | Self::AdminComplaints)
    }

    /// 获取认证失败时的重定向目标
    pub fn auth_failure_redirect() -> Self {
        Self::Login
    }
}

impl Display for AppRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_path())
    }
}

// =========================================================
// Location: 路由 + 查询参数
// =========================================================

/// 可导航的 URL 状态
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub route: AppRoute,
    pub query: BTreeMap<String, String>,
}

impl Location {
    pub fn new(route: AppRoute) -> Self {
        Self {
            route,
            query: BTreeMap::new(),
        }
    }

    /// 解析 `path?key=value&...`；未知路径归入默认路由，查询参数保留
    pub fn parse(url: &str) -> Self {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };

        let query = query
            .map(|q| {
                q.split('&')
                    .filter(|pair| !pair.is_empty())
                    .map(|pair| match pair.split_once('=') {
                        Some((k, v)) => (k.to_string(), v.to_string()),
                        None => (pair.to_string(), String::new()),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            route: AppRoute::resolve(path),
            query,
        }
    }

    pub fn with_query(mut self, key: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => {
                self.query.insert(key.to_string(), value.to_string());
            }
            None => {
                self.query.remove(key);
            }
        }
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn status_filter(&self) -> StatusFilter {
        StatusFilter::from_query(self.query_value(QUERY_STATUS))
    }

    /// 合并 status 参数（All 时删除），其余参数保持不变
    pub fn with_status_filter(self, filter: StatusFilter) -> Self {
        self.with_query(QUERY_STATUS, filter.as_query())
    }

    pub fn to_url(&self) -> String {
        if self.query.is_empty() {
            return self.route.to_path().to_string();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}?{}", self.route.to_path(), query.join("&"))
    }
}

impl From<AppRoute> for Location {
    fn from(route: AppRoute) -> Self {
        Self::new(route)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campusvoice_shared::ComplaintStatus;

    #[test]
    fn test_unmatched_paths_fall_back_to_complaints() {
        assert_eq!(AppRoute::resolve("/nowhere"), AppRoute::Complaints);
        assert_eq!(AppRoute::resolve(""), AppRoute::Complaints);
        assert_eq!(AppRoute::resolve("/"), AppRoute::Complaints);
        assert_eq!(AppRoute::resolve("/admin/complaints/"), AppRoute::AdminComplaints);
        assert_eq!(AppRoute::from_path("/nowhere"), None);
    }

    #[test]
    fn test_route_guard_properties() {
        assert!(AppRoute::AdminComplaints.requires_auth());
        assert!(AppRoute::AdminComplaints.requires_admin());
        assert!(!AppRoute::Complaints.requires_admin());
        assert!(AppRoute::Login.guest_only());
        assert!(AppRoute::Register.guest_only());
        assert!(!AppRoute::Login.requires_auth());
    }

    #[test]
    fn test_location_status_roundtrip() {
        let location = Location::new(AppRoute::Complaints)
            .with_status_filter(StatusFilter::Only(ComplaintStatus::Approved));
        assert_eq!(location.to_url(), "/complaints?status=approved");

        let reparsed = Location::parse(&location.to_url());
        assert_eq!(reparsed, location);
        assert_eq!(
            reparsed.status_filter(),
            StatusFilter::Only(ComplaintStatus::Approved)
        );

        let cleared = reparsed.with_status_filter(StatusFilter::All);
        assert_eq!(cleared.to_url(), "/complaints");
    }

    #[test]
    fn test_status_merge_keeps_other_params() {
        let location = Location::parse("/admin/complaints?page=2&status=pending")
            .with_status_filter(StatusFilter::Only(ComplaintStatus::Rejected));
        assert_eq!(location.query_value("page"), Some("2"));
        assert_eq!(location.to_url(), "/admin/complaints?page=2&status=rejected");
    }
}
