//! 学生投诉列表：筛选、提交、删除自己的投诉

use std::cell::{Cell, RefCell};

use campusvoice_shared::{Complaint, CreateComplaintRequest, StatusFilter};

use super::list::{ListCore, ListPhase, ViewScope};
use crate::api::ComplaintClient;
use crate::auth::SessionStore;
use crate::validation::validate_complaint;
use crate::web::router::Router;

pub struct ComplaintsPage {
    client: ComplaintClient,
    session: SessionStore,
    router: Router,
    list: ListCore,
    filter: Cell<StatusFilter>,
    draft: RefCell<String>,
    submitting: Cell<bool>,
    submit_error: RefCell<Option<String>>,
    submitted: Cell<bool>,
}

impl ComplaintsPage {
    /// 筛选状态从当前 URL 的 `status` 参数恢复
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
            draft: RefCell::new(String::new()),
            submitting: Cell::new(false),
            submit_error: RefCell::new(None),
            submitted: Cell::new(false),
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

    pub fn items(&self) -> Vec<Complaint> {
        self.list.items()
    }

    /// 当前筛选下可见的条目（派生视图）
    pub fn visible(&self) -> Vec<Complaint> {
        let filter = self.filter.get();
        self.list
            .items()
            .into_iter()
            .filter(|c| filter.matches(c))
            .collect()
    }

    pub async fn load(&self) {
        let filter = self.filter.get();
        self.list.load(self.client.list_complaints(filter)).await;
    }

    /// 切换筛选：写回 URL 并按新筛选重新拉取
    pub async fn set_status_filter(&self, filter: StatusFilter) {
        self.filter.set(filter);
        let location = self.router.current().with_status_filter(filter);
        self.router.push(location);
        self.load().await;
    }

    // ---- 提交 ----

    pub fn draft(&self) -> String {
        self.draft.borrow().clone()
    }

    pub fn set_draft(&self, text: &str) {
        *self.draft.borrow_mut() = text.to_string();
        self.submitted.set(false);
    }

    pub fn submit_error(&self) -> Option<String> {
        self.submit_error.borrow().clone()
    }

    pub fn submitted(&self) -> bool {
        self.submitted.get()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.get()
    }

    /// 提交新投诉；成功后清空草稿并重新加载列表
    pub async fn submit(&self) -> Option<Complaint> {
        if self.submitting.get() {
            return None;
        }

        let req = CreateComplaintRequest {
            description: self.draft.borrow().trim().to_string(),
        };
        if let Err(e) = validate_complaint(&req) {
            *self.submit_error.borrow_mut() = Some(e.to_string());
            return None;
        }

        self.submitting.set(true);
        *self.submit_error.borrow_mut() = None;
        self.submitted.set(false);

        let result = self.client.create_complaint(&req.description).await;
        self.submitting.set(false);

        if !self.list.scope().is_alive() {
            return None;
        }

        match result {
            Ok(complaint) => {
                tracing::info!(complaint_id = %complaint.id, "complaint submitted");
                self.draft.borrow_mut().clear();
                self.submitted.set(true);
                self.load().await;
                Some(complaint)
            }
            Err(e) => {
                *self.submit_error.borrow_mut() = Some(e.message);
                None
            }
        }
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

    pub fn is_busy(&self, id: &str) -> bool {
        self.list.busy().is_busy(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestApp, complaint_json, student_json};
    use crate::web::http::MockReply;
    use crate::web::route::AppRoute;
    use campusvoice_shared::ComplaintStatus;
    use campusvoice_shared::protocol::HttpMethod;
    use serde_json::json;

    #[tokio::test]
    async fn test_filter_roundtrips_through_url() {
        let t = TestApp::with_student();
        t.http.mock_json(HttpMethod::Get, &t.url("/complaints"), 200, json!([]));
        t.http.mock_json(
            HttpMethod::Get,
            &t.url("/complaints?status=approved"),
            200,
            json!([complaint_json("c1", "u1", "approved")]),
        );

        let page = t.app.complaints_page();
        page.load().await;
        page.set_status_filter(StatusFilter::Only(ComplaintStatus::Approved))
            .await;
        assert_eq!(t.app.router.current_url(), "/complaints?status=approved");
        assert_eq!(page.visible().len(), 1);

        // 以结果 URL 重新进入视图：同样的筛选、同样的请求
        let t2 = TestApp::signed_in(student_json(), "/complaints?status=approved");
        t2.http.mock_json(
            HttpMethod::Get,
            &t2.url("/complaints?status=approved"),
            200,
            json!([]),
        );
        let reloaded = t2.app.complaints_page();
        assert_eq!(reloaded.filter(), StatusFilter::Only(ComplaintStatus::Approved));
        reloaded.load().await;
        assert_eq!(
            t2.http
                .request_count(HttpMethod::Get, &t2.url("/complaints?status=approved")),
            1
        );
    }

    #[tokio::test]
    async fn test_visible_is_derived_from_full_list() {
        let t = TestApp::with_student();
        t.http.mock_json(
            HttpMethod::Get,
            &t.url("/complaints"),
            200,
            json!([
                complaint_json("c1", "u1", "pending"),
                complaint_json("c2", "u1", "rejected")
            ]),
        );
        let page = t.app.complaints_page();
        page.load().await;
        page.filter.set(StatusFilter::Only(ComplaintStatus::Rejected));
        assert_eq!(page.items().len(), 2);
        assert_eq!(page.visible().len(), 1);
    }

    #[tokio::test]
    async fn test_short_description_never_reaches_network() {
        let t = TestApp::with_student();
        let page = t.app.complaints_page();
        page.set_draft("  too short ");
        assert!(page.submit().await.is_none());
        assert_eq!(
            page.submit_error().as_deref(),
            Some("Description must be at least 10 characters.")
        );
        assert_eq!(t.http.requests.borrow().len(), 0);
    }

    #[tokio::test]
    async fn test_submit_clears_draft_and_reloads() {
        let t = TestApp::with_student();
        t.http.mock_json(
            HttpMethod::Post,
            &t.url("/complaints"),
            201,
            complaint_json("c9", "u1", "pending"),
        );
        t.http.mock_json(
            HttpMethod::Get,
            &t.url("/complaints"),
            200,
            json!([complaint_json("c9", "u1", "pending")]),
        );

        let page = t.app.complaints_page();
        page.set_draft("  The library wifi drops every hour  ");
        let created = page.submit().await.unwrap();
        assert_eq!(created.id, "c9");
        assert!(page.submitted());
        assert_eq!(page.draft(), "");
        assert_eq!(page.items().len(), 1);

        let post = &t.http.requests.borrow()[0];
        let body: serde_json::Value = serde_json::from_str(post.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["description"], "The library wifi drops every hour");
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let t = TestApp::with_student();
        t.http.mock_json(
            HttpMethod::Get,
            &t.url("/complaints"),
            200,
            json!([
                complaint_json("c1", "u1", "pending"),
                complaint_json("c2", "u2", "approved")
            ]),
        );
        t.http
            .mock(HttpMethod::Delete, &t.url("/complaints/c1"), MockReply::empty(204));

        let page = t.app.complaints_page();
        page.load().await;

        assert!(!page.confirm_delete().await);
        assert_eq!(t.http.request_count(HttpMethod::Delete, &t.url("/complaints/c1")), 0);

        // 别人的投诉不可删除
        assert!(!page.request_delete("c2"));

        assert!(page.request_delete("c1"));
        assert_eq!(page.pending_delete().map(|c| c.id).as_deref(), Some("c1"));
        assert!(page.confirm_delete().await);
        assert!(page.pending_delete().is_none());
        let ids: Vec<String> = page.items().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["c2".to_string()]);
    }

    #[tokio::test]
    async fn test_load_failure_shows_banner_and_keeps_items() {
        let t = TestApp::with_student();
        t.http.mock_json(
            HttpMethod::Get,
            &t.url("/complaints"),
            200,
            json!([complaint_json("c1", "u1", "pending")]),
        );
        t.http
            .mock(HttpMethod::Get, &t.url("/complaints"), MockReply::network_error());

        let page = t.app.complaints_page();
        page.load().await;
        page.load().await;
        assert_eq!(
            page.load_error().as_deref(),
            Some("Network error. Please check your connection.")
        );
        assert_eq!(page.items().len(), 1);
    }

    #[tokio::test]
    async fn test_forced_logout_discards_results_of_the_old_view() {
        let t = TestApp::with_student();
        t.http.mock(
            HttpMethod::Get,
            &t.url("/complaints"),
            MockReply::json(200, json!([complaint_json("c1", "u1", "pending")])).delayed(3),
        );
        t.http
            .mock(HttpMethod::Post, &t.url("/complaints"), MockReply::empty(401));

        let old_scope = t.app.view_scope();
        let page = t.app.complaints_page();
        page.set_draft("Library wifi keeps dropping");

        let ((), submitted) = futures::join!(page.load(), page.submit());

        assert!(submitted.is_none());
        assert_eq!(t.app.router.current_route(), AppRoute::Login);
        assert!(!t.app.session.is_authenticated());
        assert!(!old_scope.is_alive());
        assert!(t.app.view_scope().is_alive());
        // 慢加载的结果没有写回已离开的视图
        assert!(page.items().is_empty());
        assert_eq!(page.phase(), ListPhase::Loading);
    }
}
