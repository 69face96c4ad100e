//! HTTP 传输层抽象
//!
//! `HttpClient` 是与远端 API 之间唯一的接缝：
//! - 生产环境使用 `ReqwestHttpClient`
//! - 测试使用可编程的 `MockHttpClient`
//!
//! 本层只负责把请求发出去、把状态码和响应体带回来，
//! 不解释状态码，也不做错误翻译（见 `crate::api::ApiGateway`）。

use std::collections::HashMap;
use std::time::Duration;

use campusvoice_shared::protocol::HttpMethod;
use thiserror::Error;

#[cfg(test)]
use std::cell::RefCell;
#[cfg(test)]
use std::collections::VecDeque;

// =========================================================
// 核心抽象层 (HTTP Interface Abstraction)
// =========================================================

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(url: &str, method: HttpMethod) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 没有拿到任何 HTTP 响应的失败（对应状态码 0）
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request could not be built: {0}")]
    Build(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("response body could not be read: {0}")]
    Body(String),
}

/// HTTP 客户端特性 (Trait)
///
/// 单线程协作式执行：(?Send)，调用方持有 `Rc<dyn HttpClient>`。
#[async_trait::async_trait(?Send)]
pub trait HttpClient {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// =========================================================
// 实现层: reqwest 客户端 (Production)
// =========================================================

#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// `cookie_store` 为 true 时启用 cookie 会话（服务端会话模式需要）。
    pub fn new(cookie_store: bool, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder().cookie_store(cookie_store);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait(?Send)]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match req.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &req.url);

        for (k, v) in &req.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else if e.is_builder() {
                TransportError::Build(e.to_string())
            } else {
                TransportError::Connect(e.to_string())
            }
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

// =========================================================
// 测试工具: MockHttpClient
// =========================================================

/// 预设的一次应答
#[cfg(test)]
#[derive(Clone)]
pub struct MockReply {
    /// `None` 表示网络层失败（无响应）
    pub status: Option<u16>,
    pub body: String,
    /// 应答前让出执行权的次数，用于编排重叠请求的完成顺序
    pub yields: usize,
}

#[cfg(test)]
impl MockReply {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status: Some(status),
            body: body.to_string(),
            yields: 0,
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status: Some(status),
            body: String::new(),
            yields: 0,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status: Some(status),
            body: body.to_string(),
            yields: 0,
        }
    }

    pub fn network_error() -> Self {
        Self {
            status: None,
            body: String::new(),
            yields: 0,
        }
    }

    pub fn delayed(mut self, yields: usize) -> Self {
        self.yields = yields;
        self
    }
}

/// 记录下来的请求
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

#[cfg(test)]
pub struct MockHttpClient {
    // (Method, URL) -> 应答队列；队列只剩最后一个时重复使用
    responses: RefCell<HashMap<(HttpMethod, String), VecDeque<MockReply>>>,
    pub requests: RefCell<Vec<RecordedRequest>>,
}

#[cfg(test)]
impl MockHttpClient {
    pub fn new() -> Self {
        Self {
            responses: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// 追加一个应答；同一 key 多次调用形成队列
    pub fn mock(&self, method: HttpMethod, url: &str, reply: MockReply) {
        self.responses
            .borrow_mut()
            .entry((method, url.to_string()))
            .or_default()
            .push_back(reply);
    }

    pub fn mock_json(&self, method: HttpMethod, url: &str, status: u16, body: serde_json::Value) {
        self.mock(method, url, MockReply::json(status, body));
    }

    pub fn request_count(&self, method: HttpMethod, url: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.method == method && r.url == url)
            .count()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.borrow().last().cloned()
    }

    fn next_reply(&self, method: HttpMethod, url: &str) -> Option<MockReply> {
        let mut responses = self.responses.borrow_mut();
        let queue = responses.get_mut(&(method, url.to_string()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[cfg(test)]
#[async_trait::async_trait(?Send)]
impl HttpClient for MockHttpClient {
    async fn send(&self, req: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(RecordedRequest {
            method: req.method,
            url: req.url.clone(),
            headers: req.headers.clone(),
            body: req.body.clone(),
        });

        let reply = self.next_reply(req.method, &req.url);

        let Some(reply) = reply else {
            return Ok(HttpResponse {
                status: 404,
                status_text: "Not Found".to_string(),
                body: String::new(),
            });
        };

        for _ in 0..reply.yields {
            tokio::task::yield_now().await;
        }

        match reply.status {
            Some(status) => Ok(HttpResponse {
                status,
                status_text: reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or_default()
                    .to_string(),
                body: reply.body,
            }),
            None => Err(TransportError::Connect("connection refused".to_string())),
        }
    }
}
