//! 控制环错误类型
//!
//! BackendUnavailable / OracleUnavailable 只中止当前一轮；MalformedDecision 降级为 none 决策；
//! UnknownAction / ParameterError / HandlerFailure 转为 ActionResult 的 error 写入记忆，不向上传播。

use thiserror::Error;

/// 控制环运行过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error("Resource backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Decision oracle unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Malformed decision: {0}")]
    MalformedDecision(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid parameters for {action}: {reason}")]
    ParameterError { action: String, reason: String },

    #[error("{action} failed: {reason}")]
    HandlerFailure { action: String, reason: String },
}

impl ControlError {
    pub fn parameter(action: &str, reason: impl Into<String>) -> Self {
        Self::ParameterError {
            action: action.to_string(),
            reason: reason.into(),
        }
    }

    pub fn handler(action: &str, reason: impl Into<String>) -> Self {
        Self::HandlerFailure {
            action: action.to_string(),
            reason: reason.into(),
        }
    }
}
