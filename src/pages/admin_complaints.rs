//! 管理后台：状态审核、评论、删除

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use campusvoice_shared::{Complaint, ComplaintStatus, StatusFilter};

use super::list::{ListCore, ListPhase, ViewScope};
use crate::api::ComplaintClient;
use crate::auth::SessionStore;
use crate::error::ApiError;
use crate::validation::ValidationError;
use crate::web::router::Router;

pub struct AdminComplaintsPage {
    client: ComplaintClient,
    session: SessionStore,
    router: Router,
    list: ListCore,
    filter: Cell<StatusFilter>,
    /// 每个条目独立的评论草稿
    drafts: RefCell<HashMap<String, String>>,
}

impl AdminComplaintsPage {
    pub fn new(
        client: ComplaintClient,
        session: SessionStore,
        router: Router,
        scope: ViewScope,
    ) -> Self {
        let filter = router.current().status_filter();
        Self {
            client,
            session,
            router,
            list: ListCore::new(scope),
            filter: Cell::new(filter),
            drafts: RefCell::new(HashMap::new()),
        }
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter.get()
    }

    pub fn phase(&self) -> ListPhase {
        self.list.phase()
    }

    pub fn load_error(&self) -> Option<String> {
        self.list.load_error()
    }

    pub fn action_error(&self) -> Option<String> {
        self.list.action_error()
    }

    pub fn clear_action_error(&self) {
        self.list.clear_action_error();
    }

    pub fn items(&self) -> Vec<Complaint> {
        self.list.items()
    }

    pub fn find(&self, id: &str) -> Option<Complaint> {
        self.list.find(id)
    }

    pub fn visible(&self) -> Vec<Complaint> {
        let filter = self.filter.get();
        self.list
            .items()
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect()
    }

    pub fn is_busy(&self, id: &str) -> bool {
        self.list.busy().is_busy(id)
    }

    pub async fn load(&self) {
        let filter = self.filter.get();
        self.list
            .load(self.client.list_admin_complaints(filter))
            .await;
    }

    pub async fn set_status_filter(&self, filter: StatusFilter) {
        self.filter.set(filter);
        let location = self.router.current().with_status_filter(filter);
        self.router.push(location);
        self.load().await;
    }

    // ---- 状态审核 ----

    /// 更新状态（可附带评论）
    ///
    /// 同一条目已有操作在途时直接返回 `false`。
    /// 成功后以服务端返回的条目替换缓存，再整体刷新列表。
    pub async fn update_status(
        &self,
        id: &str,
        status: ComplaintStatus,
        comment: Option<&str>,
    ) -> bool {
        let comment = comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        self.submit_update(id, status, comment).await
    }

    async fn submit_update(
        &self,
        id: &str,
        status: ComplaintStatus,
        comment: Option<String>,
    ) -> bool {
        let Some(current) = self.list.find(id) else {
            return false;
        };
        if !current.status.can_transition_to(status) {
            let e = ApiError::from(ValidationError::InvalidTransition);
            self.list.set_action_error(e.message);
            return false;
        }
        let Some(guard) = self.list.busy().try_acquire(id) else {
            tracing::debug!(complaint_id = id, "update ignored, item busy");
            return false;
        };

        self.list.clear_action_error();
        let result = self
            .client
            .update_complaint_status(id, status, comment.as_deref())
            .await;
        drop(guard);

        if !self.list.scope().is_alive() {
            return false;
        }

        match result {
            Ok(updated) => {
                tracing::info!(
                    complaint_id = id,
                    status = updated.status.as_str(),
                    admin_id = ?self.session.current_user().map(|u| u.id),
                    "complaint updated"
                );
                self.list.replace_item(updated);
                if comment.is_some() {
                    self.drafts.borrow_mut().remove(id);
                }
                self.load().await;
                true
            }
            Err(e) => {
                tracing::warn!(complaint_id = id, error = %e, "status update failed");
                self.list.set_action_error(e.message);
                false
            }
        }
    }

    // ---- 评论 ----

    pub fn comment_draft(&self, id: &str) -> String {
        self.drafts.borrow().get(id).cloned().unwrap_or_default()
    }

    pub fn set_comment_draft(&self, id: &str, text: &str) {
        self.drafts
            .borrow_mut()
            .insert(id.to_string(), text.to_string());
    }

    /// 单独提交评论：沿用条目当前状态
    ///
    /// 草稿去空白后为空时什么也不做；成功后清空该条目的草稿。
    pub async fn submit_comment(&self, id: &str) -> bool {
        let draft = self.comment_draft(id);
        let content = draft.trim();
        if content.is_empty() {
            return false;
        }
        let Some(current) = self.list.find(id) else {
            return false;
        };
        self.submit_update(id, current.status, Some(content.to_string()))
            .await
    }

    // ---- 删除 ----

    pub fn pending_delete(&self) -> Option<Complaint> {
        self.list.pending_delete()
    }

    pub fn request_delete(&self, id: &str) -> bool {
        self.list
            .request_delete(self.session.current_user().as_ref(), id)
    }

    pub fn cancel_delete(&self) {
        self.list.cancel_delete();
    }

    pub async fn confirm_delete(&self) -> bool {
        let client = self.client.clone();
        self.list
            .confirm_delete(|id| async move { client.delete_complaint(&id).await })
            .await
    }
}
