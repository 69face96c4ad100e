use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod protocol;

// =========================================================
// 常量定义 (Constants)
// =========================================================

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const QUERY_STATUS: &str = "status";

// =========================================================
// 用户模型 (User)
// =========================================================

/// 用户角色
///
/// 封闭枚举：每个决策点（落地页、删除权限）都要穷尽匹配。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub role: UserRole,
}

impl User {
    pub fn is_admin(&self) -> bool {
        match self.role {
            UserRole::Admin => true,
            UserRole::Student => false,
        }
    }

    /// 显示名：优先 name，其次 username，最后 email
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.username.as_deref().filter(|u| !u.trim().is_empty()))
            .unwrap_or(&self.email)
    }
}

// =========================================================
// 投诉模型 (Complaint)
// =========================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplaintStatus {
    Pending,
    Approved,
    Rejected,
}

impl ComplaintStatus {
    pub const ALL: [ComplaintStatus; 3] = [
        ComplaintStatus::Pending,
        ComplaintStatus::Approved,
        ComplaintStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "pending",
            ComplaintStatus::Approved => "approved",
            ComplaintStatus::Rejected => "rejected",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComplaintStatus::Pending => "Pending",
            ComplaintStatus::Approved => "Approved",
            ComplaintStatus::Rejected => "Rejected",
        }
    }

    /// 状态徽章样式
    pub fn badge_class(&self) -> &'static str {
        match self {
            ComplaintStatus::Approved => "bg-emerald-400/20 text-emerald-200 border-emerald-400/40",
            ComplaintStatus::Rejected => "bg-rose-400/20 text-rose-200 border-rose-400/40",
            ComplaintStatus::Pending => "bg-amber-400/20 text-amber-200 border-amber-400/40",
        }
    }

    /// 状态流转规则
    ///
    /// 原样重发当前状态总是允许的（仅追加评论）；任何状态都不能回到 pending。
    pub fn can_transition_to(&self, target: ComplaintStatus) -> bool {
        if *self == target {
            return true;
        }
        match target {
            ComplaintStatus::Pending => false,
            ComplaintStatus::Approved | ComplaintStatus::Rejected => true,
        }
    }
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 未知的状态字符串
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown complaint status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for ComplaintStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ComplaintStatus::Pending),
            "approved" => Ok(ComplaintStatus::Approved),
            "rejected" => Ok(ComplaintStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// 管理员评论（客户端只追加，不编辑、不删除）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintComment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub admin_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: String,
    pub description: String,
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<ComplaintComment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub like_count: Option<u32>,
}

impl Complaint {
    pub fn is_owned_by(&self, user: &User) -> bool {
        self.user_id == user.id
    }

    pub fn comments(&self) -> &[ComplaintComment] {
        self.comments.as_deref().unwrap_or(&[])
    }

    /// 点赞数文案
    pub fn likes_label(&self) -> String {
        match self.like_count {
            None => "Likes".to_string(),
            Some(1) => "1 Like".to_string(),
            Some(n) => format!("{} Likes", n),
        }
    }
}

// =========================================================
// 状态筛选 (StatusFilter)
// =========================================================

/// 列表状态筛选
///
/// 纯客户端视图状态，通过 URL 的 `status` 查询参数往返。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ComplaintStatus),
}

impl StatusFilter {
    pub const OPTIONS: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Only(ComplaintStatus::Pending),
        StatusFilter::Only(ComplaintStatus::Approved),
        StatusFilter::Only(ComplaintStatus::Rejected),
    ];

    /// 从查询参数解析；缺失或未知值都视为 All
    pub fn from_query(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse::<ComplaintStatus>().ok())
            .map(StatusFilter::Only)
            .unwrap_or(StatusFilter::All)
    }

    /// 写回查询参数的值；All 不写入
    pub fn as_query(&self) -> Option<&'static str> {
        self.status().map(|s| s.as_str())
    }

    pub fn status(&self) -> Option<ComplaintStatus> {
        match self {
            StatusFilter::All => None,
            StatusFilter::Only(status) => Some(*status),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Only(status) => status.label(),
        }
    }

    pub fn matches(&self, complaint: &Complaint) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => complaint.status == *status,
        }
    }
}

impl From<ComplaintStatus> for StatusFilter {
    fn from(status: ComplaintStatus) -> Self {
        StatusFilter::Only(status)
    }
}

// =========================================================
// 请求体 (Request Bodies)
// =========================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Token 模式下登录/注册的响应体
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateComplaintRequest {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateComplaintRequest {
    pub status: ComplaintStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}
