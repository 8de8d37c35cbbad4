// ==========================================
// 隧道超前地质预报 - 数据网关错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::record::RecordDecodeError;
use thiserror::Error;

/// 数据网关错误类型
#[derive(Error, Debug)]
pub enum GatewayError {
    // ===== 传输错误 =====
    #[error("网络请求失败: {0}")]
    Transport(String),

    #[error("请求超时: {0}")]
    Timeout(String),

    #[error("HTTP 错误: status={status}, {message}")]
    HttpStatus { status: u16, message: String },

    // ===== 业务错误 =====
    #[error("业务错误 (resultcode={code}): {message}")]
    Business { code: i64, message: String },

    #[error("操作被拒绝: {0}")]
    Rejected(String),

    #[error("记录未找到: id={0}")]
    NotFound(i64),

    // ===== 数据错误 =====
    #[error("响应解析失败: {0}")]
    Decode(String),

    // ===== 本地数据存储 =====
    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("网关配置错误: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GatewayError {
    /// 传输层问题（可由用户手动重试）
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::Transport(_)
                | GatewayError::Timeout(_)
                | GatewayError::HttpStatus { status: 500..=599, .. }
                | GatewayError::LockError(_)
        )
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout(err.to_string())
        } else if let Some(status) = err.status() {
            GatewayError::HttpStatus {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => GatewayError::Database(msg),
            _ => GatewayError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

impl From<RecordDecodeError> for GatewayError {
    fn from(err: RecordDecodeError) -> Self {
        GatewayError::Decode(err.to_string())
    }
}

/// Result 类型别名
pub type GatewayResult<T> = Result<T, GatewayError>;
