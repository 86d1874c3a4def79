//! 状态定义：控制环阶段、运行统计与单轮报告

use serde::Serialize;

use crate::actions::ActionResult;
use crate::decision::Decision;

/// 控制环阶段（通过 watch 通道对外投影）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Idle,
    Snapshotting,
    Prompting,
    AwaitingOracle,
    Dispatching,
    Recording,
    Sleeping,
}

/// 运行统计
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LoopStats {
    /// 已完成（含失败）的轮数
    pub cycles: u64,
    pub failed_cycles: u64,
    pub consecutive_failures: u64,
}

impl LoopStats {
    pub fn record_success(&mut self) {
        self.cycles += 1;
        self.consecutive_failures = 0;
    }

    pub fn record_failure(&mut self) {
        self.cycles += 1;
        self.failed_cycles += 1;
        self.consecutive_failures += 1;
    }
}

/// /api/status 的返回体
#[derive(Clone, Debug, Serialize)]
pub struct LoopStatus {
    pub phase: LoopPhase,
    #[serde(flatten)]
    pub stats: LoopStats,
}

/// 一轮的结果：决策与动作结果（action 为 none 时无结果）
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleReport {
    pub decision: Decision,
    pub result: Option<ActionResult>,
}
