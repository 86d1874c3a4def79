//! 记忆层：决策记忆（MemoryLedger）、目标（GoalRegistry）、持久化
//!
//! 两者由 AgentMemory 统一持有，控制环与动作分发器通过同一把锁访问。

pub mod goals;
pub mod ledger;
pub mod persistence;

pub use goals::GoalRegistry;
pub use ledger::{MemoryEntry, MemoryLedger};
pub use persistence::MemoryPersistence;

/// 进程内共享的可变状态：决策记忆 + 目标
#[derive(Clone, Debug, Default)]
pub struct AgentMemory {
    pub ledger: MemoryLedger,
    pub goals: GoalRegistry,
}

impl AgentMemory {
    /// capacity：记忆总保留上限，None 表示不限
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            ledger: MemoryLedger::with_capacity(capacity),
            goals: GoalRegistry::new(),
        }
    }
}
