//! 资源后端抽象
//!
//! 所有后端（docker CLI / Mock）实现 ResourceBackend：列出容器/镜像/网络/卷，
//! 创建、删除、更新容器，在容器内执行命令，读取日志。每个方法对应一次后端调用。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// 容器 ID 展示长度（与 docker CLI 的短 ID 一致）
pub const SHORT_ID_LEN: usize = 12;

/// 后端调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// 后端不可达（守护进程未启动、可执行文件缺失、调用超时）
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("no such container: {0}")]
    NotFound(String),

    #[error("{0}")]
    Failed(String),
}

/// 快照中的容器：短 ID、名称、状态、镜像标签
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub status: String,
    pub image: Vec<String>,
}

/// list_containers 动作返回的精简条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub status: String,
}

impl From<&ContainerInfo> for ContainerSummary {
    fn from(c: &ContainerInfo) -> Self {
        Self {
            id: c.id.clone(),
            name: c.name.clone(),
            status: c.status.clone(),
        }
    }
}

/// 容器内执行命令的结果（输出为原始字节，由调用方解码）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub output: Vec<u8>,
}

/// 截取短 ID
pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

/// 资源后端 trait：核心只依赖这组操作
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// 列出全部容器（含已停止）
    async fn list_containers(&self) -> Result<Vec<ContainerInfo>, BackendError>;

    /// 列出镜像，每个镜像为其标签列表（无标签镜像为空列表）
    async fn list_images(&self) -> Result<Vec<Vec<String>>, BackendError>;

    async fn list_networks(&self) -> Result<Vec<String>, BackendError>;

    async fn list_volumes(&self) -> Result<Vec<String>, BackendError>;

    /// 创建并后台启动容器；options 为透传给后端的额外参数
    async fn create_container(
        &self,
        name: &str,
        image: &str,
        options: &Map<String, Value>,
    ) -> Result<ContainerInfo, BackendError>;

    /// 强制删除容器
    async fn remove_container(&self, name: &str) -> Result<(), BackendError>;

    /// 更新容器运行时属性
    async fn update_container(
        &self,
        name: &str,
        options: &Map<String, Value>,
    ) -> Result<(), BackendError>;

    async fn exec(&self, name: &str, command: &[String]) -> Result<ExecOutput, BackendError>;

    /// 读取日志末尾 tail 行
    async fn logs(&self, name: &str, tail: u32) -> Result<Vec<u8>, BackendError>;

    /// 后端名称（用于日志）
    fn name(&self) -> &str {
        "backend"
    }
}
