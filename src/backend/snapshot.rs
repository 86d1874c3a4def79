//! 资源池状态快照
//!
//! 每轮重新读取全部容器/镜像/网络/卷，按稳定顺序排序，可选截断，生成提供给决策模型的只读视图。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{ContainerInfo, ResourceBackend};
use crate::core::ControlError;

/// 某一时刻的资源池只读视图
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStateSnapshot {
    pub containers: Vec<ContainerInfo>,
    pub images: Vec<Vec<String>>,
    pub networks: Vec<String>,
    pub volumes: Vec<String>,
}

/// 快照器：持有后端与每个列表的截断上限
pub struct StateSnapshotter {
    backend: Arc<dyn ResourceBackend>,
    max_items: Option<usize>,
}

impl StateSnapshotter {
    pub fn new(backend: Arc<dyn ResourceBackend>) -> Self {
        Self {
            backend,
            max_items: None,
        }
    }

    pub fn with_max_items(mut self, max_items: Option<usize>) -> Self {
        self.max_items = max_items;
        self
    }

    /// 读取当前资源池；任一列表读取失败即视为后端不可用
    pub async fn snapshot(&self) -> Result<SystemStateSnapshot, ControlError> {
        let backend = self.backend.as_ref();
        let (mut containers, mut images, mut networks, mut volumes) = tokio::try_join!(
            backend.list_containers(),
            backend.list_images(),
            backend.list_networks(),
            backend.list_volumes(),
        )
        .map_err(|e| ControlError::BackendUnavailable(e.to_string()))?;

        containers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        images.sort_by(|a, b| a.first().cmp(&b.first()).then_with(|| a.cmp(b)));
        networks.sort();
        volumes.sort();

        if let Some(limit) = self.max_items {
            let total = containers.len() + images.len() + networks.len() + volumes.len();
            containers.truncate(limit);
            images.truncate(limit);
            networks.truncate(limit);
            volumes.truncate(limit);
            let kept = containers.len() + images.len() + networks.len() + volumes.len();
            if kept < total {
                tracing::debug!(limit, dropped = total - kept, "snapshot truncated");
            }
        }

        Ok(SystemStateSnapshot {
            containers,
            images,
            networks,
            volumes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;

    fn backend() -> MockBackend {
        MockBackend::new()
            .with_container("def456", "db", "exited")
            .with_container("abc123", "web", "running")
            .with_container("aaa111", "cache", "running")
            .with_image(&["redis:7"])
            .with_image(&[])
            .with_image(&["nginx:latest", "nginx:1.25"])
            .with_network("host")
            .with_network("bridge")
            .with_volume("pgdata")
    }

    #[tokio::test]
    async fn test_snapshot_is_sorted() {
        let snapshotter = StateSnapshotter::new(Arc::new(backend()));
        let snap = snapshotter.snapshot().await.unwrap();

        let names: Vec<&str> = snap.containers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["cache", "db", "web"]);
        assert_eq!(
            snap.images,
            vec![
                vec![],
                vec!["nginx:latest".to_string(), "nginx:1.25".to_string()],
                vec!["redis:7".to_string()],
            ]
        );
        assert_eq!(snap.networks, vec!["bridge".to_string(), "host".to_string()]);
        assert_eq!(snap.volumes, vec!["pgdata".to_string()]);
    }

    #[tokio::test]
    async fn test_snapshot_truncation_is_deterministic() {
        let snapshotter = StateSnapshotter::new(Arc::new(backend())).with_max_items(Some(2));
        let first = snapshotter.snapshot().await.unwrap();
        let second = snapshotter.snapshot().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.containers.len(), 2);
        assert_eq!(first.containers[0].name, "cache");
        assert_eq!(first.containers[1].name, "db");
        assert_eq!(first.images.len(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_backend_unavailable() {
        let backend = Arc::new(backend());
        backend.set_available(false);
        let snapshotter = StateSnapshotter::new(backend);
        let err = snapshotter.snapshot().await.unwrap_err();
        assert!(matches!(err, ControlError::BackendUnavailable(_)));
    }
}
