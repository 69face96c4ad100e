//! 运行时配置
//!
//! 从环境变量读取，读不到就用默认值。
//! 读取经由 `EnvSource`，测试可以注入任意变量。

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_STATE_DIR: &str = ".campusvoice";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_FILTER: &str = "campusvoice=info";

const VAR_API_BASE_URL: &str = "CAMPUSVOICE_API_BASE_URL";
const VAR_SESSION_MODE: &str = "CAMPUSVOICE_SESSION_MODE";
const VAR_STATE_DIR: &str = "CAMPUSVOICE_STATE_DIR";
const VAR_HTTP_TIMEOUT_SECS: &str = "CAMPUSVOICE_HTTP_TIMEOUT_SECS";
const VAR_LOG: &str = "CAMPUSVOICE_LOG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got `{value}`")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must be `cookie` or `token`, got `{value}`")]
    InvalidSessionMode { var: &'static str, value: String },

    #[error("{var} must be a whole number of seconds, got `{value}`")]
    InvalidNumber { var: &'static str, value: String },
}

/// 环境变量来源
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// 进程环境变量
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

/// 会话证明方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionMode {
    /// 服务端会话 cookie；身份靠 "who am I" 证明，不落盘
    Cookie,
    /// Bearer token；token 与用户记录持久化，启动时恢复
    #[default]
    Token,
}

impl SessionMode {
    pub fn persists_identity(&self) -> bool {
        match self {
            SessionMode::Cookie => false,
            SessionMode::Token => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API 基础地址（不带结尾的 `/`）
    pub api_base_url: String,
    pub session_mode: SessionMode,
    /// Token 模式下持久化状态所在目录
    pub state_dir: PathBuf,
    /// 传输层超时，0 表示不设置
    pub http_timeout: Option<Duration>,
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            session_mode: SessionMode::default(),
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            http_timeout: Some(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(&ProcessEnv)
    }

    pub fn load(env: &impl EnvSource) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_base_url = match env.var(VAR_API_BASE_URL) {
            Some(url) => normalize_base_url(VAR_API_BASE_URL, &url)?,
            None => defaults.api_base_url,
        };

        let session_mode = match env.var(VAR_SESSION_MODE) {
            Some(mode) => match mode.trim().to_ascii_lowercase().as_str() {
                "cookie" => SessionMode::Cookie,
                "token" | "bearer" => SessionMode::Token,
                _ => {
                    return Err(ConfigError::InvalidSessionMode {
                        var: VAR_SESSION_MODE,
                        value: mode,
                    });
                }
            },
            None => defaults.session_mode,
        };

        let state_dir = env
            .var(VAR_STATE_DIR)
            .map(PathBuf::from)
            .unwrap_or(defaults.state_dir);

        let http_timeout = match env.var(VAR_HTTP_TIMEOUT_SECS) {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber {
                        var: VAR_HTTP_TIMEOUT_SECS,
                        value: raw.clone(),
                    })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => defaults.http_timeout,
        };

        let log_filter = env.var(VAR_LOG).unwrap_or(defaults.log_filter);

        Ok(Self {
            api_base_url,
            session_mode,
            state_dir,
            http_timeout,
            log_filter,
        })
    }

    /// 覆盖 API 地址（命令行参数优先于环境变量）
    pub fn with_api_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base_url("--api", url)?;
        Ok(self)
    }
}

fn normalize_base_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let url = raw.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl {
            var,
            value: raw.to_string(),
        });
    }
    Ok(url.to_string())
}
