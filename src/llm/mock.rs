//! Mock 决策模型（用于测试，无需 API）
//!
//! 按顺序返回预设的回复；预设用完后回复一个 none 决策。记录收到的每个提示词。

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::llm::{DecisionOracle, OracleError};

/// 预设耗尽后的默认回复
pub const IDLE_DECISION: &str = r#"{"thought_process": "Nothing to do", "action": "none", "parameters": {}, "explanation": "Waiting for the next cycle."}"#;

#[derive(Default)]
pub struct MockOracle {
    script: Mutex<VecDeque<Result<String, OracleError>>>,
    prompts: Mutex<Vec<String>>,
    /// 每次回复前的等待，模拟慢速模型
    delay: Option<Duration>,
}

impl MockOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// 追加一条成功回复
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()));
        self
    }

    /// 追加一次失败
    pub fn fail(self, err: OracleError) -> Self {
        self.push(Err(err));
        self
    }

    pub fn push(&self, item: Result<String, OracleError>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(item);
    }

    /// 至今收到的提示词
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl DecisionOracle for MockOracle {
    async fn propose(&self, prompt: &str) -> Result<String, OracleError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Ok(IDLE_DECISION.to_string()))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
