//! 资源后端层：后端抽象与实现（docker CLI / Mock）、状态快照

pub mod docker;
pub mod mock;
pub mod snapshot;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use docker::DockerCli;
pub use mock::{BackendCall, MockBackend};
pub use snapshot::{StateSnapshotter, SystemStateSnapshot};
pub use traits::{
    short_id, BackendError, ContainerInfo, ContainerSummary, ExecOutput, ResourceBackend,
};

/// 根据配置选择资源后端（docker CLI / Mock）
pub fn create_backend_from_config(cfg: &AppConfig) -> Arc<dyn ResourceBackend> {
    let backend = &cfg.backend;
    match backend.kind.to_lowercase().as_str() {
        "mock" => {
            tracing::warn!("Using Mock backend, no real containers will be touched");
            Arc::new(MockBackend::new())
        }
        other => {
            if other != "docker" {
                tracing::warn!("Unknown backend kind '{}', falling back to docker", other);
            }
            tracing::info!("Using docker backend ({})", backend.docker_bin);
            Arc::new(DockerCli::new(&backend.docker_bin, backend.timeout_secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_selection() {
        let mut cfg = AppConfig::default();
        assert_eq!(create_backend_from_config(&cfg).name(), "docker");

        cfg.backend.kind = "MOCK".to_string();
        assert_eq!(create_backend_from_config(&cfg).name(), "mock");
    }
}
