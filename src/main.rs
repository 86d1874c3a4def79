//! hivectl - 无头控制环
//!
//! 入口：初始化日志、加载配置、组装控制环并运行，直到 Ctrl+C / SIGTERM；
//! 退出前导出目标与记忆（若配置了 control.state_file）。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use hivectl::agent::build_control_loop;
use hivectl::config::load_config;
use hivectl::core::{MemoryExportCleanup, ShutdownCoordinator, ShutdownManager};
use hivectl::memory::MemoryPersistence;
use hivectl::observability;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    // 可选：第一个参数为额外的配置文件
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).context("Failed to load config")?;

    let control = build_control_loop(&cfg).context("Failed to build control loop")?;

    let manager = Arc::new(ShutdownManager::new());
    manager.install_signal_handlers();
    let mut coordinator = ShutdownCoordinator::new();
    if let Some(path) = &cfg.control.state_file {
        coordinator.register(MemoryExportCleanup::new(
            control.memory(),
            MemoryPersistence::new(path),
        ));
    }

    tracing::info!("{} started", cfg.app.name);
    control.run(manager.token()).await;

    coordinator.run_cleanup().await;
    Ok(())
}
