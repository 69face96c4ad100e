//! 社区投诉：其他同学已批准的投诉，可点赞/取消点赞

use std::cell::RefCell;
use std::collections::HashMap;

use campusvoice_shared::Complaint;

use super::list::{ListCore, ListPhase, ViewScope};
use crate::api::ComplaintClient;
use crate::auth::SessionStore;

pub struct CommunityPage {
    client: ComplaintClient,
    session: SessionStore,
    list: ListCore,
    /// 客户端本地的点赞状态
    liked: RefCell<HashMap<String, bool>>,
}

impl CommunityPage {
    pub fn new(client: ComplaintClient, session: SessionStore, scope: ViewScope) -> Self {
        Self {
            client,
            session,
            list: ListCore::new(scope),
            liked: RefCell::new(HashMap::new()),
        }
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

    pub fn find(&self, id: &str) -> Option<Complaint> {
        self.list.find(id)
    }

    pub fn items(&self) -> Vec<Complaint> {
        self.list.items()
    }

    /// 排除当前用户自己的投诉
    pub fn visible(&self) -> Vec<Complaint> {
        let me = self.session.current_user();
        self.list
            .items()
            .into_iter()
            .filter(|c| me.as_ref().is_none_or(|u| !c.is_owned_by(u)))
            .collect()
    }

    pub fn is_liked(&self, id: &str) -> bool {
        self.liked.borrow().get(id).copied().unwrap_or(false)
    }

    pub fn is_busy(&self, id: &str) -> bool {
        self.list.busy().is_busy(id)
    }

    pub async fn load(&self) {
        self.list.load(self.client.list_approved()).await;
    }

    /// 切换点赞（乐观更新）
    ///
    /// 先在本地改动点赞数与点赞状态，再发请求；
    /// 失败时把条目恢复成改动前的快照，成功后刷新列表拿到权威计数。
    /// 不能给自己的投诉点赞；同一条目的上一次切换未完成时直接忽略。
    pub async fn toggle_like(&self, id: &str) -> bool {
        let Some(me) = self.session.current_user() else {
            return false;
        };
        let Some(item) = self.list.find(id) else {
            return false;
        };
        if item.is_owned_by(&me) {
            tracing::debug!(complaint_id = id, "own complaint cannot be liked");
            return false;
        }
        let Some(guard) = self.list.busy().try_acquire(id) else {
            return false;
        };

        let was_liked = self.is_liked(id);
        let Some(snapshot) = self.list.apply_tentative(id, |c| {
            c.like_count = c.like_count.map(|n| {
                if was_liked {
                    n.saturating_sub(1)
                } else {
                    n + 1
                }
            });
        }) else {
            return false;
        };
        self.liked.borrow_mut().insert(id.to_string(), !was_liked);
        self.list.clear_action_error();

        let result = if was_liked {
            self.client.unlike_complaint(id).await
        } else {
            self.client.like_complaint(id).await
        };
        drop(guard);

        if !self.list.scope().is_alive() {
            return false;
        }

        match result {
            Ok(()) => {
                tracing::info!(complaint_id = id, liked = !was_liked, "like toggled");
                self.load().await;
                true
            }
            Err(e) => {
                tracing::warn!(complaint_id = id, error = %e, "like toggle failed, reverting");
                self.list.revert(snapshot);
                self.liked.borrow_mut().insert(id.to_string(), was_liked);
                self.list.set_action_error(e.message);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestApp, liked_complaint_json};
    use crate::web::http::MockReply;
    use campusvoice_shared::protocol::HttpMethod;
    use serde_json::json;

    fn setup() -> TestApp {
        let t = TestApp::with_student();
        t.http.mock_json(
            HttpMethod::Get,
            &t.url("/complaints/approved"),
            200,
            json!([
                liked_complaint_json("c1", "u2", 3),
                liked_complaint_json("c2", "u1", 5)
            ]),
        );
        t
    }

    #[tokio::test]
    async fn test_own_complaints_are_hidden() {
        let t = setup();
        let page = t.app.community_page();
        page.load().await;
        assert_eq!(page.items().len(), 2);
        let visible: Vec<String> = page.visible().into_iter().map(|c| c.id).collect();
        assert_eq!(visible, vec!["c1".to_string()]);
    }

    #[tokio::test]
    async fn test_like_is_optimistic_then_refreshed() {
        let t = setup();
        t.http.mock(
            HttpMethod::Post,
            &t.url("/complaints/c1/like"),
            MockReply::empty(204).delayed(2),
        );
        t.http.mock_json(
            HttpMethod::Get,
            &t.url("/complaints/approved"),
            200,
            json!([
                liked_complaint_json("c1", "u2", 9),
                liked_complaint_json("c2", "u1", 5)
            ]),
        );

        let page = t.app.community_page();
        page.load().await;

        let observe = async {
            tokio::task::yield_now().await;
            (page.find("c1").unwrap().like_count, page.is_liked("c1"))
        };
        let (liked, during) = futures::join!(page.toggle_like("c1"), observe);
        assert!(liked);
        assert_eq!(during, (Some(4), true));

        // 刷新后以服务端计数为准
        assert_eq!(page.find("c1").unwrap().like_count, Some(9));
        assert!(page.is_liked("c1"));
    }

    #[tokio::test]
    async fn test_failed_like_restores_exact_snapshot() {
        let t = setup();
        t.http.mock(
            HttpMethod::Post,
            &t.url("/complaints/c1/like"),
            MockReply::network_error(),
        );

        let page = t.app.community_page();
        page.load().await;
        let before = page.items();

        assert!(!page.toggle_like("c1").await);
        assert_eq!(page.items(), before);
        assert!(!page.is_liked("c1"));
        assert_eq!(
            page.action_error().as_deref(),
            Some("Network error. Please check your connection.")
        );
        assert!(!page.is_busy("c1"));
    }

    #[tokio::test]
    async fn test_owner_cannot_like() {
        let t = setup();
        let page = t.app.community_page();
        page.load().await;
        assert!(!page.toggle_like("c2").await);
        assert_eq!(
            t.http
                .request_count(HttpMethod::Post, &t.url("/complaints/c2/like")),
            0
        );
        assert_eq!(page.find("c2").unwrap().like_count, Some(5));
    }

    #[tokio::test]
    async fn test_toggle_while_in_flight_is_ignored() {
        let t = setup();
        t.http.mock(
            HttpMethod::Post,
            &t.url("/complaints/c1/like"),
            MockReply::empty(204).delayed(3),
        );

        let page = t.app.community_page();
        page.load().await;
        let (first, second) = futures::join!(page.toggle_like("c1"), page.toggle_like("c1"));
        assert!(first);
        assert!(!second);
        assert_eq!(
            t.http
                .request_count(HttpMethod::Post, &t.url("/complaints/c1/like")),
            1
        );
        assert_eq!(
            t.http
                .request_count(HttpMethod::Delete, &t.url("/complaints/c1/like")),
            0
        );
    }

    #[tokio::test]
    async fn test_unlike_clamps_at_zero_and_reverts() {
        let t = TestApp::with_student();
        t.http.mock_json(
            HttpMethod::Get,
            &t.url("/complaints/approved"),
            200,
            json!([liked_complaint_json("c1", "u2", 0)]),
        );
        t.http.mock(
            HttpMethod::Delete,
            &t.url("/complaints/c1/like"),
            MockReply::empty(500).delayed(2),
        );

        let page = t.app.community_page();
        page.load().await;
        page.liked.borrow_mut().insert("c1".to_string(), true);

        let observe = async {
            tokio::task::yield_now().await;
            (page.find("c1").unwrap().like_count, page.is_liked("c1"))
        };
        let (toggled, during) = futures::join!(page.toggle_like("c1"), observe);
        assert!(!toggled);
        assert_eq!(during, (Some(0), false));
        assert!(page.is_liked("c1"));
        assert_eq!(
            page.action_error().as_deref(),
            Some("Server error. Please try again later.")
        );
    }
}
