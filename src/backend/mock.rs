//! Mock 资源后端（用于测试与 dry-run，无需 docker）
//!
//! 内存中维护容器/镜像/网络/卷列表；记录每一次写操作，便于断言「恰好调用一次」。
//! 可通过 set_available(false) 模拟后端不可达。

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::backend::{BackendError, ContainerInfo, ExecOutput, ResourceBackend};

/// Mock 后端记录的写操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Create { name: String, image: String },
    Remove(String),
    Update(String),
    Exec { name: String, command: Vec<String> },
    Logs { name: String, tail: u32 },
}

#[derive(Default)]
struct MockState {
    containers: Vec<ContainerInfo>,
    images: Vec<Vec<String>>,
    networks: Vec<String>,
    volumes: Vec<String>,
    logs: HashMap<String, String>,
    calls: Vec<BackendCall>,
    next_id: u64,
}

/// 内存资源池
#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
    unavailable: AtomicBool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(self, id: &str, name: &str, status: &str) -> Self {
        self.lock().containers.push(ContainerInfo {
            id: id.to_string(),
            name: name.to_string(),
            status: status.to_string(),
            image: vec![],
        });
        self
    }

    pub fn with_image(self, tags: &[&str]) -> Self {
        self.lock()
            .images
            .push(tags.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn with_network(self, name: &str) -> Self {
        self.lock().networks.push(name.to_string());
        self
    }

    pub fn with_volume(self, name: &str) -> Self {
        self.lock().volumes.push(name.to_string());
        self
    }

    /// 设置容器日志全文（按行切分后取末尾）
    pub fn with_logs(self, name: &str, logs: &str) -> Self {
        self.lock().logs.insert(name.to_string(), logs.to_string());
        self
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// 至今记录的写操作
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn containers(&self) -> Vec<ContainerInfo> {
        self.lock().containers.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // 测试替身：锁中毒时沿用内部数据
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable("mock backend offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ResourceBackend for MockBackend {
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, BackendError> {
        self.check_available()?;
        Ok(self.lock().containers.clone())
    }

    async fn list_images(&self) -> Result<Vec<Vec<String>>, BackendError> {
        self.check_available()?;
        Ok(self.lock().images.clone())
    }

    async fn list_networks(&self) -> Result<Vec<String>, BackendError> {
        self.check_available()?;
        Ok(self.lock().networks.clone())
    }

    async fn list_volumes(&self) -> Result<Vec<String>, BackendError> {
        self.check_available()?;
        Ok(self.lock().volumes.clone())
    }

    async fn create_container(
        &self,
        name: &str,
        image: &str,
        _options: &Map<String, Value>,
    ) -> Result<ContainerInfo, BackendError> {
        self.check_available()?;
        let mut state = self.lock();
        state.calls.push(BackendCall::Create {
            name: name.to_string(),
            image: image.to_string(),
        });
        if state.containers.iter().any(|c| c.name == name) {
            return Err(BackendError::Failed(format!(
                "Conflict. The container name \"/{}\" is already in use",
                name
            )));
        }
        state.next_id += 1;
        let info = ContainerInfo {
            id: format!("{:012x}", state.next_id),
            name: name.to_string(),
            status: "running".to_string(),
            image: vec![image.to_string()],
        };
        state.containers.push(info.clone());
        Ok(info)
    }

    async fn remove_container(&self, name: &str) -> Result<(), BackendError> {
        self.check_available()?;
        let mut state = self.lock();
        state.calls.push(BackendCall::Remove(name.to_string()));
        let before = state.containers.len();
        state.containers.retain(|c| c.name != name);
        if state.containers.len() == before {
            return Err(BackendError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn update_container(
        &self,
        name: &str,
        _options: &Map<String, Value>,
    ) -> Result<(), BackendError> {
        self.check_available()?;
        let mut state = self.lock();
        state.calls.push(BackendCall::Update(name.to_string()));
        if !state.containers.iter().any(|c| c.name == name) {
            return Err(BackendError::NotFound(name.to_string()));
        }
        Ok(())
    }

    async fn exec(&self, name: &str, command: &[String]) -> Result<ExecOutput, BackendError> {
        self.check_available()?;
        let mut state = self.lock();
        state.calls.push(BackendCall::Exec {
            name: name.to_string(),
            command: command.to_vec(),
        });
        let container = state
            .containers
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| BackendError::NotFound(name.to_string()))?;
        if container.status != "running" {
            return Err(BackendError::Failed(format!(
                "container {} is not running",
                name
            )));
        }
        // 回显命令，echo 之外的命令以 127 退出
        let (exit_code, output) = match command.split_first() {
            Some((head, rest)) if head == "echo" => (0, format!("{}\n", rest.join(" "))),
            Some((head, _)) => (127, format!("{}: command not found\n", head)),
            None => (0, String::new()),
        };
        Ok(ExecOutput {
            exit_code,
            output: output.into_bytes(),
        })
    }

    async fn logs(&self, name: &str, tail: u32) -> Result<Vec<u8>, BackendError> {
        self.check_available()?;
        let mut state = self.lock();
        state.calls.push(BackendCall::Logs {
            name: name.to_string(),
            tail,
        });
        if !state.containers.iter().any(|c| c.name == name) {
            return Err(BackendError::NotFound(name.to_string()));
        }
        let full = state.logs.get(name).cloned().unwrap_or_default();
        let lines: Vec<&str> = full.lines().collect();
        let start = lines.len().saturating_sub(tail as usize);
        let mut out = lines[start..].join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        Ok(out.into_bytes())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
