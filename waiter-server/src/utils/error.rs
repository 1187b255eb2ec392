//! 统一错误处理
//!
//! Typed error kinds so callers can tell retryable conditions apart from
//! terminal ones instead of logging-and-continuing uniformly:
//!
//! | 分类 | 处理 |
//! |------|------|
//! | Transport | 连接层重试 (backoff) |
//! | Store | 跳过本轮 tick，保留缓存状态 |
//! | Credential | 清除凭据后重新配对 |
//! | Config / Invalid | 启动期修复 |
//! | Internal | 记录日志，不终止进程 |

use tracing::error;

/// 应用错误枚举
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Transport session failure (network blip, send timeout) — retryable
    #[error("Transport error: {0}")]
    Transport(String),

    /// External store read failure (orders, couriers, override flag) — retryable
    #[error("Store error: {0}")]
    Store(String),

    /// Credential store failure
    #[error("Credential error: {0}")]
    Credential(String),

    /// Bad configuration, surfaced at startup
    #[error("Config error: {0}")]
    Config(String),

    /// 无效请求/数据
    #[error("Invalid data: {0}")]
    Invalid(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        error!(target: "internal", error = %msg, "Internal error occurred");
        Self::Internal(msg)
    }

    /// Whether the operation may be retried on the next interval.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Store(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Invalid(format!("JSON error: {}", e))
    }
}
