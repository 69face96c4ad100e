//! 列表视图的公共机制
//!
//! - `ListPhase`: Idle / Loading / Loaded / Failed
//! - `BusySet` + `BusyGuard`: 单条目互斥，guard 析构时必定释放
//! - `LoadSequencer`: 只应用最后一次发起的加载结果
//! - `ViewScope`: 视图离开后丢弃在途请求的结果
//! - `ListCore`: 以上几者组合而成的列表状态，三个列表页共用

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::future::Future;
use std::rc::Rc;

use campusvoice_shared::{Complaint, User, UserRole};

use crate::error::ApiResult;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ListPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// 加载失败；先前已加载的条目保持不动
    Failed(String),
}

// =========================================================
// 忙碌集合 (Busy Set)
// =========================================================

/// 正在执行变更操作的条目 id 集合
#[derive(Clone, Default)]
pub struct BusySet {
    ids: Rc<RefCell<HashSet<String>>>,
}

impl BusySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self, id: &str) -> bool {
        self.ids.borrow().contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.borrow().is_empty()
    }

    /// 占用条目；已被占用时返回 `None`（调用方应当直接放弃，而不是排队重试）
    pub fn try_acquire(&self, id: &str) -> Option<BusyGuard> {
        if !self.ids.borrow_mut().insert(id.to_string()) {
            return None;
        }
        Some(BusyGuard {
            ids: self.ids.clone(),
            id: id.to_string(),
        })
    }
}

/// 条目占用凭证
#[must_use]
pub struct BusyGuard {
    ids: Rc<RefCell<HashSet<String>>>,
    id: String,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.ids.borrow_mut().remove(&self.id);
    }
}

// =========================================================
// 加载序号 (Stale-response suppression)
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

#[derive(Default)]
pub struct LoadSequencer {
    latest: Cell<u64>,
}

impl LoadSequencer {
    pub fn begin(&self) -> LoadTicket {
        let next = self.latest.get() + 1;
        self.latest.set(next);
        LoadTicket(next)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.latest.get() == ticket.0
    }
}

// =========================================================
// 视图作用域 (Cancellation)
// =========================================================

/// 视图生命周期标记
///
/// 导航离开后关闭；关闭后在途请求的结果一律丢弃。
#[derive(Debug, Clone)]
pub struct ViewScope {
    alive: Rc<Cell<bool>>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            alive: Rc::new(Cell::new(true)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    pub fn close(&self) {
        self.alive.set(false);
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

/// 删除权限：本人或管理员
pub fn can_delete(user: &User, complaint: &Complaint) -> bool {
    match user.role {
        UserRole::Admin => true,
        UserRole::Student => complaint.is_owned_by(user),
    }
}

/// 条目快照，用于乐观更新失败后原样恢复
#[derive(Debug, Clone)]
pub struct ItemSnapshot {
    item: Complaint,
}

// =========================================================
// 列表核心状态
// =========================================================

#[derive(Default)]
struct ListState {
    phase: ListPhase,
    items: Vec<Complaint>,
    action_error: Option<String>,
    pending_delete: Option<Complaint>,
}

pub struct ListCore {
    state: RefCell<ListState>,
    busy: BusySet,
    loads: LoadSequencer,
    scope: ViewScope,
}

impl ListCore {
    pub fn new(scope: ViewScope) -> Self {
        Self {
            state: RefCell::new(ListState::default()),
            busy: BusySet::new(),
            loads: LoadSequencer::default(),
            scope,
        }
    }

    pub fn scope(&self) -> &ViewScope {
        &self.scope
    }

    pub fn busy(&self) -> &BusySet {
        &self.busy
    }

    pub fn phase(&self) -> ListPhase {
        self.state.borrow().phase.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().phase == ListPhase::Loading
    }

    pub fn load_error(&self) -> Option<String> {
        match &self.state.borrow().phase {
            ListPhase::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    pub fn items(&self) -> Vec<Complaint> {
        self.state.borrow().items.clone()
    }

    pub fn find(&self, id: &str) -> Option<Complaint> {
        self.state.borrow().items.iter().find(|c| c.id == id).cloned()
    }

    /// 加载列表
    ///
    /// 结果只在视图仍然存活、且这是最后一次发起的加载时才会写回。
    pub async fn load<F>(&self, fetch: F)
    where
        F: Future<Output = ApiResult<Vec<Complaint>>>,
    {
        if !self.scope.is_alive() {
            return;
        }

        let ticket = self.loads.begin();
        self.state.borrow_mut().phase = ListPhase::Loading;

        let result = fetch.await;

        if !self.scope.is_alive() {
            tracing::debug!("view closed, dropping list response");
            return;
        }
        if !self.loads.is_current(ticket) {
            tracing::debug!("superseded list response dropped");
            return;
        }

        let mut state = self.state.borrow_mut();
        match result {
            Ok(items) => {
                state.items = items;
                state.phase = ListPhase::Loaded;
            }
            Err(e) => {
                tracing::debug!(error = %e, "list load failed");
                state.phase = ListPhase::Failed(e.message);
            }
        }
    }

    /// 用服务端返回的权威版本替换条目
    pub fn replace_item(&self, item: Complaint) -> bool {
        if !self.scope.is_alive() {
            return false;
        }
        let mut state = self.state.borrow_mut();
        match state.items.iter_mut().find(|c| c.id == item.id) {
            Some(slot) => {
                *slot = item;
                true
            }
            None => false,
        }
    }

    /// 在条目上应用一次暂定修改，返回修改前的快照
    pub fn apply_tentative(
        &self,
        id: &str,
        change: impl FnOnce(&mut Complaint),
    ) -> Option<ItemSnapshot> {
        let mut state = self.state.borrow_mut();
        let item = state.items.iter_mut().find(|c| c.id == id)?;
        let snapshot = ItemSnapshot { item: item.clone() };
        change(item);
        Some(snapshot)
    }

    /// 恢复快照
    pub fn revert(&self, snapshot: ItemSnapshot) {
        if !self.scope.is_alive() {
            return;
        }
        let mut state = self.state.borrow_mut();
        if let Some(slot) = state.items.iter_mut().find(|c| c.id == snapshot.item.id) {
            *slot = snapshot.item;
        }
    }

    // ---- 操作级错误 (非致命，可关闭) ----

    pub fn action_error(&self) -> Option<String> {
        self.state.borrow().action_error.clone()
    }

    pub fn set_action_error(&self, message: impl Into<String>) {
        if self.scope.is_alive() {
            self.state.borrow_mut().action_error = Some(message.into());
        }
    }

    pub fn clear_action_error(&self) {
        self.state.borrow_mut().action_error = None;
    }

    // ---- 删除确认 ----

    pub fn pending_delete(&self) -> Option<Complaint> {
        self.state.borrow().pending_delete.clone()
    }

    /// 选中待删除条目；无权限或条目正忙时不打开确认
    pub fn request_delete(&self, user: Option<&User>, id: &str) -> bool {
        let Some(user) = user else {
            return false;
        };
        let Some(item) = self.find(id) else {
            return false;
        };
        if !can_delete(user, &item) || self.busy.is_busy(id) {
            return false;
        }
        self.state.borrow_mut().pending_delete = Some(item);
        true
    }

    pub fn cancel_delete(&self) {
        self.state.borrow_mut().pending_delete = None;
    }

    /// 确认删除
    ///
    /// 没有待确认条目时什么也不做。确认框在发出请求时即关闭；
    /// 成功后从缓存列表移除，失败时条目保留并给出操作级错误。
    pub async fn confirm_delete<F, Fut>(&self, delete: F) -> bool
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ApiResult<()>>,
    {
        let Some(candidate) = self.state.borrow_mut().pending_delete.take() else {
            return false;
        };
        let Some(_guard) = self.busy.try_acquire(&candidate.id) else {
            return false;
        };

        self.clear_action_error();
        let result = delete(candidate.id.clone()).await;

        if !self.scope.is_alive() {
            return false;
        }
        match result {
            Ok(()) => {
                tracing::info!(complaint_id = %candidate.id, "complaint deleted");
                self.state
                    .borrow_mut()
                    .items
                    .retain(|c| c.id != candidate.id);
                true
            }
            Err(e) => {
                tracing::warn!(complaint_id = %candidate.id, error = %e, "delete failed");
                self.set_action_error(e.message);
                false
            }
        }
    }
}
