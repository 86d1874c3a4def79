//! Ollama 客户端
//!
//! 调用本地 Ollama 的 /api/generate（非流式），可选 format = "json" 让模型只输出 JSON。

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::llm::{DecisionOracle, OracleError};

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const OLLAMA_DEFAULT_MODEL: &str = "qwen2";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Ollama 决策模型
pub struct OllamaOracle {
    http: reqwest::Client,
    base_url: String,
    model: String,
    json_mode: bool,
}

impl OllamaOracle {
    pub fn new(base_url: Option<&str>, model: &str, json_mode: bool, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url
                .unwrap_or(OLLAMA_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            model: model.to_string(),
            json_mode,
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl DecisionOracle for OllamaOracle {
    async fn propose(&self, prompt: &str) -> Result<String, OracleError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            format: self.json_mode.then_some("json"),
        };

        let response = self
            .http
            .post(self.generate_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| OracleError::Request(e.to_string()))?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?;

        if body.response.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(body.response)
    }

    fn describe(&self) -> String {
        format!("ollama:{}", self.model)
    }
}
