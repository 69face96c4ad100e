//! 路由服务模块 - 导航历史
//!
//! 内存中的 History 实现：push / replace / back / forward。
//! 守卫不在这里求值（见 `crate::app::App::navigate`），
//! 这里只负责"当前在哪"和"怎么回去"。

use std::cell::RefCell;
use std::rc::Rc;

use super::route::{AppRoute, Location};

struct History {
    entries: Vec<Location>,
    index: usize,
}

/// 路由器服务
///
/// 可廉价克隆；所有克隆共享同一份历史。
#[derive(Clone)]
pub struct Router {
    history: Rc<RefCell<History>>,
}

impl Router {
    pub fn new(initial: Location) -> Self {
        Self {
            history: Rc::new(RefCell::new(History {
                entries: vec![initial],
                index: 0,
            })),
        }
    }

    pub fn current(&self) -> Location {
        let history = self.history.borrow();
        history.entries[history.index].clone()
    }

    pub fn current_route(&self) -> AppRoute {
        let history = self.history.borrow();
        history.entries[history.index].route
    }

    pub fn current_url(&self) -> String {
        self.current().to_url()
    }

    /// 推入新的历史记录（丢弃前进分支）
    pub fn push(&self, location: Location) {
        tracing::debug!(to = %location, "router push");
        let mut history = self.history.borrow_mut();
        let next = history.index + 1;
        history.entries.truncate(next);
        history.entries.push(location);
        history.index = next;
    }

    /// 替换当前历史记录（用于重定向）
    pub fn replace(&self, location: Location) {
        tracing::debug!(to = %location, "router replace");
        let mut history = self.history.borrow_mut();
        let index = history.index;
        history.entries[index] = location;
    }

    pub fn push_url(&self, url: &str) {
        self.push(Location::parse(url));
    }

    pub fn can_go_back(&self) -> bool {
        self.history.borrow().index > 0
    }

    pub fn back(&self) -> Option<Location> {
        let mut history = self.history.borrow_mut();
        if history.index == 0 {
            return None;
        }
        history.index -= 1;
        Some(history.entries[history.index].clone())
    }

    pub fn forward(&self) -> Option<Location> {
        let mut history = self.history.borrow_mut();
        if history.index + 1 >= history.entries.len() {
            return None;
        }
        history.index += 1;
        Some(history.entries[history.index].clone())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Location::default())
    }
}
