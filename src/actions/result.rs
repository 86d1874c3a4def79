//! 动作执行结果
//!
//! 序列化形态与动作对应：{message} / {error} / {containers} / {logs} / {exit_code, output}。

use serde::{Deserialize, Serialize};

use crate::backend::ContainerSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionResult {
    Error { error: String },
    Containers { containers: Vec<ContainerSummary> },
    Logs { logs: String },
    Exec { exit_code: i64, output: String },
    Message { message: String },
}

impl ActionResult {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
