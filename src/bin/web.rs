//! hivectl Web
//!
//! 启动: cargo run --bin hivectl-web --features web
//! 控制环在后台运行，HTTP 接口可按需触发一轮并查看状态、目标与记忆。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use hivectl::agent::build_control_loop;
use hivectl::config::load_config;
use hivectl::core::{MemoryExportCleanup, ShutdownCoordinator, ShutdownManager, ShutdownReason};
use hivectl::memory::MemoryPersistence;
use hivectl::{observability, web};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

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

    let background = {
        let control = Arc::clone(&control);
        let token = manager.token();
        tokio::spawn(async move { control.run(token).await })
    };

    let addr = format!("{}:{}", cfg.web.host, cfg.web.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("{} web: http://{}", cfg.app.name, addr);

    let token = manager.token();
    axum::serve(listener, web::router(Arc::clone(&control)))
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .context("HTTP server failed")?;

    // 服务器也可能因其他原因退出，确保控制环随之停止
    manager.shutdown(ShutdownReason::ServerStopped);
    if let Err(e) = background.await {
        tracing::warn!("control loop task ended abnormally: {}", e);
    }

    coordinator.run_cleanup().await;
    Ok(())
}
