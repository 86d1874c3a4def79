//! 目标列表
//!
//! 有序的当前目标（插入顺序即优先级提示），仅由 set_goal 动作追加，控制环不会自动移除。

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalRegistry {
    goals: Vec<String>,
}

impl GoalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_goal(&mut self, goal: impl Into<String>) {
        self.goals.push(goal.into());
    }

    pub fn list(&self) -> &[String] {
        &self.goals
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}
