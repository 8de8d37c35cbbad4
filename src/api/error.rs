// ==========================================
// 隧道超前地质预报 - API层错误类型
// ==========================================
// 职责: 汇总引擎/网关错误，转换为面向用户的错误消息
// 约定: 任何错误都不改动内存中的草稿，用户可重试或放弃
// ==========================================

use crate::domain::types::MethodTag;
use crate::engine::error::{BuildError, ListError};
use crate::engine::lifecycle::LifecycleError;
use crate::engine::validator::{ValidationError, ValidationViolation};
use crate::gateway::error::GatewayError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 本地校验
    // ==========================================
    /// 保存被阻止，violations 指出需要高亮的字段
    #[error("数据校验失败: {reason}")]
    Validation {
        reason: String,
        violations: Vec<ValidationViolation>,
    },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("方法不一致: 期望 {expected}, 实际 {found}")]
    MethodMismatch { expected: MethodTag, found: MethodTag },

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 远端调用
    // ==========================================
    #[error("{message}")]
    Gateway {
        message: String,
        /// 传输层问题（可手动重试）
        transient: bool,
        #[source]
        source: GatewayError,
    },

    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 后端返回了占位/异常数据（如新增成功但无标识）
    #[error("后端响应不完整: {0}")]
    DegradedResponse(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 需要高亮的字段路径
    pub fn invalid_fields(&self) -> Vec<&str> {
        match self {
            ApiError::Validation { violations, .. } => {
                violations.iter().map(|v| v.field.as_str()).collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Gateway { transient: true, .. })
    }
}

// ==========================================
// 从 GatewayError 转换
// 目的: 传输层技术错误转为用户可理解的提示
// ==========================================
impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        let transient = err.is_transient();
        let message = match &err {
            GatewayError::NotFound(id) => return ApiError::NotFound(format!("记录(id={})不存在", id)),
            GatewayError::Timeout(_) => "请求超时，请检查网络后重试".to_string(),
            GatewayError::Transport(_) => "网络连接失败，请检查网络后重试".to_string(),
            GatewayError::HttpStatus { status: 401, .. } => "登录已失效，请重新登录".to_string(),
            GatewayError::HttpStatus { status: 403, .. } => "没有权限执行该操作".to_string(),
            GatewayError::HttpStatus { status, message } => {
                format!("服务请求失败 ({}): {}", status, message)
            }
            GatewayError::Business { message, .. } => message.clone(),
            GatewayError::Rejected(msg) => format!("操作失败: {}", msg),
            GatewayError::Decode(_) => "服务返回的数据无法解析".to_string(),
            GatewayError::LockError(msg) | GatewayError::Database(msg) => {
                format!("本地数据存储错误: {}", msg)
            }
            GatewayError::Config(msg) => format!("数据网关配置错误: {}", msg),
            GatewayError::Other(e) => e.to_string(),
        };
        ApiError::Gateway {
            message,
            transient,
            source: err,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation {
            reason: err.reason(),
            violations: err.violations,
        }
    }
}

impl From<BuildError> for ApiError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::MethodMismatch { expected, found } => {
                ApiError::MethodMismatch { expected, found }
            }
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidTransition { from, to } => ApiError::InvalidStateTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
            LifecycleError::MissingIdentifier(_) | LifecycleError::MissingPayload => {
                ApiError::InvalidInput(err.to_string())
            }
        }
    }
}

impl From<ListError> for ApiError {
    fn from(err: ListError) -> Self {
        match err {
            ListError::Validation(e) => e.into(),
            other => ApiError::InvalidInput(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::lifecycle::LifecycleState;

    #[test]
    fn test_gateway_error_mapping() {
        let err: ApiError = GatewayError::Timeout("10s".to_string()).into();
        assert!(err.is_transient());
        assert!(err.to_string().contains("超时"));

        let err: ApiError = GatewayError::NotFound(3).into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = GatewayError::Business {
            code: 500,
            message: "里程重复".to_string(),
        }
        .into();
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "里程重复");
    }

    #[test]
    fn test_lifecycle_error_mapping() {
        let err: ApiError = LifecycleError::InvalidTransition {
            from: LifecycleState::New,
            to: LifecycleState::Submitted,
        }
        .into();
        assert!(matches!(
            err,
            ApiError::InvalidStateTransition { ref from, ref to } if from == "NEW" && to == "SUBMITTED"
        ));
    }
}
