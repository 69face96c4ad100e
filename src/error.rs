use std::fmt;

use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;
use crate::web::http::{HttpResponse, TransportError};

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";
pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "Unexpected response from server.";

// =========================================================
// 传输失败的形态 (Failure Shape)
// =========================================================

/// 失败响应体
#[derive(Debug, Clone, PartialEq)]
pub enum FailureBody {
    Empty,
    Text(String),
    Json(serde_json::Value),
}

impl FailureBody {
    /// 能解析成 JSON 就按 JSON 处理，否则保留原文
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return FailureBody::Empty;
        }
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => FailureBody::Json(value),
            Err(_) => FailureBody::Text(raw.to_string()),
        }
    }
}

/// 一次失败调用的完整形态
///
/// `status == 0` 表示没有拿到任何响应（网络层失败）。
#[derive(Debug, Clone, PartialEq)]
pub struct ApiFailure {
    pub status: u16,
    pub status_text: String,
    pub body: FailureBody,
}

impl ApiFailure {
    pub fn from_response(resp: &HttpResponse) -> Self {
        Self {
            status: resp.status,
            status_text: resp.status_text.clone(),
            body: FailureBody::parse(&resp.body),
        }
    }

    pub fn from_transport(_err: &TransportError) -> Self {
        Self {
            status: 0,
            status_text: String::new(),
            body: FailureBody::Empty,
        }
    }

    /// 响应体中携带的消息
    ///
    /// JSON 对象的 `message` 字段或 JSON 字符串在任何状态码下都采用；
    /// 纯文本只在 4xx 时采用，避免把网关的错误页面原样展示出来。
    fn carried_message(&self) -> Option<&str> {
        match &self.body {
            FailureBody::Empty => None,
            FailureBody::Json(serde_json::Value::String(s)) => Some(s.as_str()),
            FailureBody::Json(serde_json::Value::Object(map)) => {
                map.get("message").and_then(|m| m.as_str())
            }
            FailureBody::Json(_) => None,
            FailureBody::Text(text) if (400..500).contains(&self.status) => Some(text.as_str()),
            FailureBody::Text(_) => None,
        }
    }
}

// =========================================================
// 错误归一化 (Error Normalizer)
// =========================================================

/// 把一次失败映射为唯一的用户可见消息
///
/// 优先级：
/// 1. 响应体携带的消息（去除 URL、折叠空白后非空）
/// 2. 无响应 -> 固定的网络错误消息
/// 3. 5xx -> 固定的服务端错误消息
/// 4. 状态文本，或 "Request failed (status)."
pub fn normalize(failure: &ApiFailure) -> String {
    if let Some(message) = failure.carried_message() {
        let sanitized = strip_urls(message);
        if !sanitized.is_empty() {
            return sanitized;
        }
    }

    if failure.status == 0 {
        return NETWORK_ERROR_MESSAGE.to_string();
    }

    if failure.status >= 500 {
        return SERVER_ERROR_MESSAGE.to_string();
    }

    if !failure.status_text.trim().is_empty() {
        return failure.status_text.trim().to_string();
    }

    format!("Request failed ({}).", failure.status)
}

/// 删除 `http(s)://` 开头直到下一个空白为止的内容，并折叠空白
fn strip_urls(text: &str) -> String {
    text.split_whitespace()
        .filter_map(|token| {
            let cut = [token.find("http://"), token.find("https://")]
                .into_iter()
                .flatten()
                .min();
            let kept = match cut {
                Some(at) => &token[..at],
                None => token,
            };
            (!kept.is_empty()).then_some(kept)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// =========================================================
// 调用方拿到的错误 (ApiError)
// =========================================================

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApiErrorKind {
    /// 本地校验失败，请求没有发出
    Validation,
    /// 没有响应
    Network,
    /// 401: 会话已被全局重置
    Unauthorized,
    /// 403: 仅作为操作级消息展示
    Forbidden,
    /// 其他 4xx（冲突、服务端校验等）
    Rejected,
    /// 5xx
    Server,
    /// 2xx 但响应体无法解析
    Decode,
}

impl ApiErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            0 => ApiErrorKind::Network,
            401 => ApiErrorKind::Unauthorized,
            403 => ApiErrorKind::Forbidden,
            500.. => ApiErrorKind::Server,
            _ => ApiErrorKind::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    /// HTTP 状态码（本地错误和网络错误为 0）
    pub status: u16,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, status: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
        }
    }

    pub fn from_failure(failure: &ApiFailure) -> Self {
        Self::new(
            ApiErrorKind::from_status(failure.status),
            failure.status,
            normalize(failure),
        )
    }

    pub fn decode(status: u16) -> Self {
        Self::new(ApiErrorKind::Decode, status, UNEXPECTED_RESPONSE_MESSAGE)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::new(ApiErrorKind::Validation, 0, e.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn failure(status: u16, status_text: &str, body: FailureBody) -> ApiFailure {
        ApiFailure {
            status,
            status_text: status_text.to_string(),
            body,
        }
    }

    #[test]
    fn test_structured_message_wins() {
        let f = failure(
            409,
            "Conflict",
            FailureBody::Json(json!({"message": "Email already registered"})),
        );
        assert_eq!(normalize(&f), "Email already registered");
    }

    #[test]
    fn test_structured_message_even_on_server_error() {
        let f = failure(
            503,
            "Service Unavailable",
            FailureBody::Json(json!({"message": "Maintenance window"})),
        );
        assert_eq!(normalize(&f), "Maintenance window");
    }

    #[test]
    fn test_urls_are_stripped_and_whitespace_collapsed() {
        let f = failure(
            400,
            "Bad Request",
            FailureBody::Json(json!({
                "message": "  Invalid input,\n see https://docs.example.com/errors#42   for   details "
            })),
        );
        assert_eq!(normalize(&f), "Invalid input, see for details");
    }

    #[test]
    fn test_url_only_message_falls_through() {
        let f = failure(
            400,
            "Bad Request",
            FailureBody::Json(json!({"message": "http://internal.host/trace/1"})),
        );
        assert_eq!(normalize(&f), "Bad Request");
    }

    #[test]
    fn test_url_glued_to_word_keeps_prefix() {
        assert_eq!(strip_urls("see(https://x.y/z) now"), "see( now");
    }

    #[test]
    fn test_network_failure() {
        let f = ApiFailure::from_transport(&TransportError::Connect("refused".into()));
        assert_eq!(normalize(&f), NETWORK_ERROR_MESSAGE);
        assert_eq!(ApiError::from_failure(&f).kind, ApiErrorKind::Network);
    }

    #[test]
    fn test_server_failure_hides_text_body() {
        let f = failure(
            502,
            "Bad Gateway",
            FailureBody::parse("<html><body>upstream down</body></html>"),
        );
        assert_eq!(normalize(&f), SERVER_ERROR_MESSAGE);
    }

    #[test]
    fn test_plain_text_body_on_client_error() {
        let f = failure(400, "Bad Request", FailureBody::parse("Description too short"));
        assert_eq!(normalize(&f), "Description too short");
    }

    #[test]
    fn test_status_text_then_generic_fallback() {
        let f = failure(404, "Not Found", FailureBody::Empty);
        assert_eq!(normalize(&f), "Not Found");

        let f = failure(418, "", FailureBody::Json(json!({"error": "teapot"})));
        assert_eq!(normalize(&f), "Request failed (418).");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let f = failure(
            422,
            "Unprocessable Entity",
            FailureBody::Json(json!({"message": "Too   many  spaces"})),
        );
        assert_eq!(normalize(&f), normalize(&f.clone()));
    }

    #[test]
    fn test_error_kind_from_status() {
        assert_eq!(ApiErrorKind::from_status(401), ApiErrorKind::Unauthorized);
        assert_eq!(ApiErrorKind::from_status(403), ApiErrorKind::Forbidden);
        assert_eq!(ApiErrorKind::from_status(409), ApiErrorKind::Rejected);
        assert_eq!(ApiErrorKind::from_status(500), ApiErrorKind::Server);
        assert_eq!(ApiErrorKind::from_status(0), ApiErrorKind::Network);
    }

    #[test]
    fn test_validation_error_never_carries_status() {
        let e = ApiError::from(ValidationError::InvalidEmail);
        assert_eq!(e.kind, ApiErrorKind::Validation);
        assert_eq!(e.status, 0);
        assert_eq!(e.message(), "Please enter a valid email address.");
    }
}
