//! 记忆持久化
//!
//! 将目标与记忆写入/从单个 JSON 文件加载，用于跨进程恢复（可选使用，由 control.state_file 开启）。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::memory::{AgentMemory, GoalRegistry, MemoryEntry};

#[derive(Serialize, Deserialize, Default)]
struct StateFile {
    #[serde(default)]
    goals: GoalRegistry,
    #[serde(default)]
    memory: Vec<MemoryEntry>,
}

/// 单文件 JSON 持久化
#[derive(Debug, Clone)]
pub struct MemoryPersistence {
    path: PathBuf,
}

impl MemoryPersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 从文件恢复到 memory（追加到现有内容之后）；文件不存在时不做任何事
    pub fn load_into(&self, memory: &mut AgentMemory) -> anyhow::Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let data = std::fs::read_to_string(&self.path)?;
        let state: StateFile = serde_json::from_str(&data)?;
        for goal in state.goals.list() {
            memory.goals.add_goal(goal.clone());
        }
        for entry in state.memory {
            memory.ledger.append(entry);
        }
        Ok(())
    }

    /// 写入 JSON 文件；父目录不存在时自动创建
    pub fn save(&self, memory: &AgentMemory) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let state = StateFile {
            goals: memory.goals.clone(),
            memory: memory.ledger.entries(),
        };
        std::fs::write(&self.path, serde_json::to_string_pretty(&state)?)?;
        Ok(())
    }
}
