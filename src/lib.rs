//! 校园投诉客户端核心
//!
//! 会话、错误归一化、投诉 API 客户端、路由守卫，以及带乐观更新的列表视图控制器。
//! 全部运行在单线程执行器上：共享状态用 `Rc` + `Cell`/`RefCell`，
//! 任何借用都不会跨过 `.await`。

pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod validation;

pub mod web {
    pub mod http;
    pub mod route;
    pub mod router;
    pub mod storage;
}

/// 视图控制器
///
/// 每个控制器持有自己的视图状态，通过 `&self` 上的异步方法驱动。
pub mod pages {
    pub mod admin_complaints;
    pub mod community;
    pub mod complaints;
    pub mod list;
    pub mod login;
    pub mod profile;
    pub mod register;

    pub use admin_complaints::AdminComplaintsPage;
    pub use community::CommunityPage;
    pub use complaints::ComplaintsPage;
    pub use list::{BusyGuard, BusySet, ListPhase, ViewScope};
    pub use login::LoginPage;
    pub use profile::ProfilePage;
    pub use register::RegisterPage;
}

#[cfg(test)]
mod test_support;
