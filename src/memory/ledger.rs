//! 决策记忆
//!
//! 只追加的决策日志：每轮的决策与执行结果写入一条 MemoryEntry，
//! recent(n) 取最近 n 条作为下一轮决策的上下文。可选总容量上限（超出时丢弃最旧条目）。

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::ActionResult;
use crate::decision::Decision;

/// 一轮决策的记录，追加后不再修改
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub decision: Decision,
    pub result: Option<ActionResult>,
}

impl MemoryEntry {
    pub fn new(timestamp: DateTime<Utc>, decision: Decision, result: Option<ActionResult>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            decision,
            result,
        }
    }
}

/// 记忆账本：按追加顺序保存；capacity 为 None 时不限总量
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    entries: VecDeque<MemoryEntry>,
    capacity: Option<usize>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn append(&mut self, entry: MemoryEntry) {
        self.entries.push_back(entry);
        if let Some(cap) = self.capacity {
            while self.entries.len() > cap {
                self.entries.pop_front();
            }
        }
    }

    /// 最近 n 条，按追加顺序；历史不足 n 条时返回全部
    pub fn recent(&self, n: usize) -> Vec<MemoryEntry> {
        let start = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(start).cloned().collect()
    }

    /// 保留的全部条目
    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
