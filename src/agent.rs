//! 控制环装配
//!
//! 按配置组装后端、决策模型、快照器、分发器与共享记忆，
//! 若配置了 control.state_file 则先从文件恢复目标与记忆。
//! 无头入口与 HTTP 入口共用。

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;

use crate::actions::ActionDispatcher;
use crate::backend::{create_backend_from_config, ResourceBackend, StateSnapshotter};
use crate::config::AppConfig;
use crate::core::{ControlLoop, LoopSettings};
use crate::llm::{create_oracle_from_config, DecisionOracle};
use crate::memory::{AgentMemory, MemoryPersistence};

/// 用配置选出的后端与决策模型构建控制环
pub fn build_control_loop(cfg: &AppConfig) -> anyhow::Result<Arc<ControlLoop>> {
    build_control_loop_with(
        cfg,
        create_backend_from_config(cfg),
        create_oracle_from_config(cfg),
    )
}

/// 用给定的后端与决策模型构建控制环（测试与嵌入场景）
pub fn build_control_loop_with(
    cfg: &AppConfig,
    backend: Arc<dyn ResourceBackend>,
    oracle: Arc<dyn DecisionOracle>,
) -> anyhow::Result<Arc<ControlLoop>> {
    let mut memory = AgentMemory::new(cfg.control.memory_capacity);
    if let Some(path) = &cfg.control.state_file {
        MemoryPersistence::new(path)
            .load_into(&mut memory)
            .with_context(|| format!("Failed to restore state from {}", path.display()))?;
        tracing::info!(
            path = %path.display(),
            entries = memory.ledger.len(),
            goals = memory.goals.len(),
            "state restored"
        );
    }
    let memory = Arc::new(RwLock::new(memory));

    let snapshotter =
        StateSnapshotter::new(backend.clone()).with_max_items(cfg.snapshot.max_items);
    let dispatcher = ActionDispatcher::new(backend, memory.clone(), cfg.backend.timeout_secs);

    Ok(Arc::new(ControlLoop::new(
        snapshotter,
        oracle,
        dispatcher,
        memory,
        LoopSettings::from_config(cfg),
    )))
}
