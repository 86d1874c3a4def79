//! 决策模型抽象
//!
//! 所有后端（Ollama / OpenAI 兼容 / DeepSeek / Mock）实现 DecisionOracle：输入提示词文本，返回决策文本。
//! 返回内容不保证是合法 JSON，解析与降级由控制环负责。

use async_trait::async_trait;
use thiserror::Error;

/// 决策模型调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("empty response")]
    EmptyResponse,
}

/// 决策模型 trait：propose(prompt) -> 决策文本
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    async fn propose(&self, prompt: &str) -> Result<String, OracleError>;

    /// 模型描述（用于日志）
    fn describe(&self) -> String {
        "oracle".to_string()
    }
}
