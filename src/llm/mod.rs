//! 决策模型层：抽象与实现（Ollama / OpenAI 兼容 / DeepSeek / Mock）

pub mod deepseek;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use deepseek::{create_deepseek_oracle, DEEPSEEK_CHAT};
pub use mock::MockOracle;
pub use ollama::{OllamaOracle, OLLAMA_DEFAULT_MODEL};
pub use openai::{OpenAiOracle, OPENAI_DEFAULT_MODEL};
pub use traits::{DecisionOracle, OracleError};

/// 根据配置选择决策模型后端（Ollama / OpenAI 兼容 / DeepSeek / Mock）
pub fn create_oracle_from_config(cfg: &AppConfig) -> Arc<dyn DecisionOracle> {
    let llm = &cfg.llm;
    match llm.provider.to_lowercase().as_str() {
        "openai" => {
            let model = llm.model.as_deref().unwrap_or(OPENAI_DEFAULT_MODEL);
            tracing::info!("Using OpenAI-compatible oracle ({})", model);
            Arc::new(OpenAiOracle::new(
                llm.base_url.as_deref(),
                model,
                std::env::var("OPENAI_API_KEY").ok().as_deref(),
            ))
        }
        "deepseek" => {
            let oracle = create_deepseek_oracle(llm.model.as_deref(), llm.base_url.as_deref());
            tracing::info!("Using DeepSeek oracle ({})", oracle.describe());
            Arc::new(oracle)
        }
        "mock" => {
            tracing::warn!("Using Mock oracle, every cycle will decide 'none'");
            Arc::new(MockOracle::new())
        }
        other => {
            if other != "ollama" {
                tracing::warn!("Unknown llm provider '{}', falling back to Ollama", other);
            }
            let model = llm.model.as_deref().unwrap_or(OLLAMA_DEFAULT_MODEL);
            tracing::info!("Using Ollama oracle ({})", model);
            Arc::new(OllamaOracle::new(
                llm.base_url.as_deref(),
                model,
                llm.json_mode,
                llm.timeouts.request,
            ))
        }
    }
}
