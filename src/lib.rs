//! hivectl - 自主容器管理控制环
//!
//! 模块划分：
//! - **actions**: 动作定义、执行结果与分发器
//! - **agent**: 按配置装配控制环
//! - **backend**: 资源后端抽象与实现（docker CLI / Mock）、状态快照
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误分类、控制环、状态投影、优雅关闭
//! - **decision**: 提示词构建与决策解析
//! - **llm**: 决策模型抽象与实现（Ollama / OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 决策记忆、目标与持久化
//! - **web**: HTTP 接口（feature = "web"）

pub mod actions;
pub mod agent;
pub mod backend;
pub mod config;
pub mod core;
pub mod decision;
pub mod llm;
pub mod memory;
pub mod observability;
#[cfg(feature = "web")]
pub mod web;
