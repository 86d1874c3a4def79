//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub backend: BackendSection,
    pub snapshot: SnapshotSection,
    pub control: ControlSection,
    pub web: WebSection,
}

/// [app] 段
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_app_name")]
    pub name: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
        }
    }
}

fn default_app_name() -> String {
    "hivectl".to_string()
}

/// [llm] 段：决策模型后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：ollama / openai / deepseek / mock
    #[serde(default = "default_provider")]
    pub provider: String,
    /// 模型名；未设置时各后端使用自己的默认模型
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// 让 Ollama 以 JSON 模式输出（format = "json"）
    #[serde(default = "default_json_mode")]
    pub json_mode: bool,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            json_mode: default_json_mode(),
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_json_mode() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    /// 单次决策请求超时（秒）
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    120
}

/// [backend] 段：资源后端类型、docker 可执行文件、单次调用超时
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSection {
    /// docker / mock
    #[serde(default = "default_backend_kind")]
    pub kind: String,
    #[serde(default = "default_docker_bin")]
    pub docker_bin: String,
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            docker_bin: default_docker_bin(),
            timeout_secs: default_backend_timeout_secs(),
        }
    }
}

fn default_backend_kind() -> String {
    "docker".to_string()
}

fn default_docker_bin() -> String {
    "docker".to_string()
}

fn default_backend_timeout_secs() -> u64 {
    30
}

/// [snapshot] 段：每个列表最多保留的条目数（未设置则不截断）
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SnapshotSection {
    pub max_items: Option<usize>,
}

/// [control] 段：循环间隔、记忆窗口与容量、状态文件
#[derive(Debug, Clone, Deserialize)]
pub struct ControlSection {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// 每轮提供给决策模型的最近记忆条数
    #[serde(default = "default_memory_window")]
    pub memory_window: usize,
    /// 记忆总保留上限；未设置时不限
    pub memory_capacity: Option<usize>,
    /// 启动时恢复、关闭时导出目标与记忆的 JSON 文件
    pub state_file: Option<PathBuf>,
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            memory_window: default_memory_window(),
            memory_capacity: None,
            state_file: None,
        }
    }
}

fn default_interval_secs() -> u64 {
    60
}

fn default_memory_window() -> usize {
    10
}

/// [web] 段：HTTP 监听地址
#[derive(Debug, Clone, Deserialize)]
pub struct WebSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}
