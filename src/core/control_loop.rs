//! 控制环：主控循环
//!
//! 每轮：快照 -> 拼提示词（快照 + 最近记忆 + 目标）-> 询问决策模型 -> 解析/校验 -> 分发动作 -> 写入记忆，
//! 然后固定间隔休眠。任何一轮的错误（包括 panic）只会跳过该轮，循环本身只因外部关闭而停止。
//!
//! 后台循环与按需触发（HTTP）共用同一个 cycle_gate，只覆盖「分发 + 写入记忆」：
//! 同一时刻最多一个动作在执行，记忆条目逐条完整追加。快照与决策模型调用不持有该锁，
//! 因此并发的两轮可能基于同一份稍旧的上下文做决策，下一轮会看到前一轮的结果。
//! 记忆与目标的读写锁只在短临界区内持有。

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::actions::ActionDispatcher;
use crate::backend::{StateSnapshotter, SystemStateSnapshot};
use crate::config::AppConfig;
use crate::core::{ControlError, CycleReport, LoopPhase, LoopStats, LoopStatus};
use crate::decision::{build_prompt, parse_decision, Decision};
use crate::llm::{DecisionOracle, OracleError};
use crate::memory::{AgentMemory, MemoryEntry};

/// 控制环参数
#[derive(Clone, Debug)]
pub struct LoopSettings {
    pub interval: Duration,
    /// 每轮提供给决策模型的最近记忆条数
    pub memory_window: usize,
    pub oracle_timeout: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            memory_window: 10,
            oracle_timeout: Duration::from_secs(120),
        }
    }
}

impl LoopSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            interval: Duration::from_secs(cfg.control.interval_secs),
            memory_window: cfg.control.memory_window,
            oracle_timeout: Duration::from_secs(cfg.llm.timeouts.request),
        }
    }
}

pub struct ControlLoop {
    snapshotter: StateSnapshotter,
    oracle: Arc<dyn DecisionOracle>,
    dispatcher: ActionDispatcher,
    memory: Arc<RwLock<AgentMemory>>,
    settings: LoopSettings,
    cycle_gate: Mutex<()>,
    phase_tx: watch::Sender<LoopPhase>,
    stats: std::sync::Mutex<LoopStats>,
}

impl ControlLoop {
    pub fn new(
        snapshotter: StateSnapshotter,
        oracle: Arc<dyn DecisionOracle>,
        dispatcher: ActionDispatcher,
        memory: Arc<RwLock<AgentMemory>>,
        settings: LoopSettings,
    ) -> Self {
        let (phase_tx, _) = watch::channel(LoopPhase::Idle);
        Self {
            snapshotter,
            oracle,
            dispatcher,
            memory,
            settings,
            cycle_gate: Mutex::new(()),
            phase_tx,
            stats: std::sync::Mutex::new(LoopStats::default()),
        }
    }

    /// 执行一轮「思考 + 分发」；后台循环与按需触发共用
    pub async fn run_cycle(&self) -> Result<CycleReport, ControlError> {
        let result = self.cycle().await;
        match &result {
            Ok(_) => self.lock_stats().record_success(),
            Err(_) => self.lock_stats().record_failure(),
        }
        self.set_phase(LoopPhase::Idle);
        result
    }

    async fn cycle(&self) -> Result<CycleReport, ControlError> {
        self.set_phase(LoopPhase::Snapshotting);
        let snapshot = self.snapshotter.snapshot().await?;

        self.set_phase(LoopPhase::Prompting);
        let (recent, goals) = {
            let memory = self.memory.read().await;
            (
                memory.ledger.recent(self.settings.memory_window),
                memory.goals.list().to_vec(),
            )
        };
        let prompt = build_prompt(&snapshot, &recent, &goals);

        self.set_phase(LoopPhase::AwaitingOracle);
        let raw = tokio::time::timeout(self.settings.oracle_timeout, self.oracle.propose(&prompt))
            .await
            .map_err(|_| {
                ControlError::OracleUnavailable(
                    OracleError::Timeout(self.settings.oracle_timeout.as_secs()).to_string(),
                )
            })?
            .map_err(|e| ControlError::OracleUnavailable(e.to_string()))?;

        let decision = match parse_decision(&raw) {
            Ok(decision) => decision,
            Err(e) => {
                tracing::error!(error = %e, raw = %raw, "Invalid decision from oracle");
                Decision::fallback()
            }
        };
        tracing::info!(
            action = %decision.action,
            thought = %decision.thought_process,
            "decision"
        );

        let _gate = self.cycle_gate.lock().await;
        let timestamp = Utc::now();
        let result = if decision.is_none() {
            None
        } else {
            self.set_phase(LoopPhase::Dispatching);
            Some(
                self.dispatcher
                    .dispatch(&decision.action, decision.parameters.clone())
                    .await,
            )
        };

        self.set_phase(LoopPhase::Recording);
        self.memory.write().await.ledger.append(MemoryEntry::new(
            timestamp,
            decision.clone(),
            result.clone(),
        ));

        Ok(CycleReport { decision, result })
    }

    /// 后台常驻循环：直到 shutdown 被取消
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            oracle = %self.oracle.describe(),
            interval_secs = self.settings.interval.as_secs(),
            "control loop started"
        );

        while !shutdown.is_cancelled() {
            match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(Ok(report)) => {
                    let result = serde_json::to_string(&report.result).unwrap_or_default();
                    tracing::info!(action = %report.decision.action, result = %result, "cycle complete");
                }
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "cycle skipped");
                }
                Err(_) => {
                    self.lock_stats().record_failure();
                    tracing::error!("cycle panicked, continuing with the next cycle");
                }
            }

            self.set_phase(LoopPhase::Sleeping);
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.settings.interval) => {}
            }
        }

        self.set_phase(LoopPhase::Idle);
        tracing::info!("control loop stopped");
    }

    /// 当前资源池快照（只读，不经过 cycle_gate）
    pub async fn system_state(&self) -> Result<SystemStateSnapshot, ControlError> {
        self.snapshotter.snapshot().await
    }

    pub async fn goals(&self) -> Vec<String> {
        self.memory.read().await.goals.list().to_vec()
    }

    /// 保留的全部记忆
    pub async fn memory_entries(&self) -> Vec<MemoryEntry> {
        self.memory.read().await.ledger.entries()
    }

    pub fn memory(&self) -> Arc<RwLock<AgentMemory>> {
        self.memory.clone()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<LoopPhase> {
        self.phase_tx.subscribe()
    }

    pub fn status(&self) -> LoopStatus {
        LoopStatus {
            phase: *self.phase_tx.borrow(),
            stats: self.lock_stats().clone(),
        }
    }

    fn set_phase(&self, phase: LoopPhase) {
        self.phase_tx.send_replace(phase);
    }

    fn lock_stats(&self) -> std::sync::MutexGuard<'_, LoopStats> {
        self.stats.lock().unwrap_or_else(|e| e.into_inner())
    }
}
