//! 动作定义
//!
//! 决策中的 action 名与 parameters 一次性解码为封闭的 Action 枚举；
//! 每个变体声明自己的必填字段，create / modify 额外参数原样透传给后端。

use serde_json::{Map, Value};

use crate::core::ControlError;
use crate::decision::ACTION_NONE;

/// get_container_logs 未指定 lines 时的默认行数
pub const DEFAULT_LOG_LINES: u32 = 50;

/// 可识别的动作及其参数说明（写入决策提示词）
pub const ACTION_CATALOG: &[(&str, &str)] = &[
    (
        "create_container",
        "name, image; optional docker run options such as environment, ports, volumes, command",
    ),
    ("delete_container", "name"),
    (
        "modify_container",
        "name; runtime properties to update such as mem_limit, cpu_shares, restart_policy",
    ),
    ("set_goal", "goal"),
    ("list_containers", "no parameters"),
    ("get_container_logs", "name; optional lines (default 50)"),
    ("execute_in_container", "name, command (string or list of strings)"),
    ("none", "no parameters; wait until the next cycle"),
];

/// 封闭的动作集合
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    CreateContainer {
        name: String,
        image: String,
        options: Map<String, Value>,
    },
    DeleteContainer {
        name: String,
    },
    ModifyContainer {
        name: String,
        options: Map<String, Value>,
    },
    SetGoal {
        goal: String,
    },
    ListContainers,
    GetLogs {
        name: String,
        lines: u32,
    },
    ExecCommand {
        name: String,
        command: Vec<String>,
    },
    None,
}

impl Action {
    /// 按动作名精确匹配并绑定参数；未知动作返回 UnknownAction，参数缺失或类型不符返回 ParameterError
    pub fn decode(action: &str, mut params: Map<String, Value>) -> Result<Self, ControlError> {
        let decoded = match action {
            "create_container" => {
                let name = required_str(action, &mut params, "name")?;
                let image = required_str(action, &mut params, "image")?;
                return Ok(Self::CreateContainer {
                    name,
                    image,
                    options: params,
                });
            }
            "modify_container" => {
                let name = required_str(action, &mut params, "name")?;
                return Ok(Self::ModifyContainer {
                    name,
                    options: params,
                });
            }
            "delete_container" => Self::DeleteContainer {
                name: required_str(action, &mut params, "name")?,
            },
            "set_goal" => Self::SetGoal {
                goal: required_str(action, &mut params, "goal")?,
            },
            "list_containers" => Self::ListContainers,
            "get_container_logs" => Self::GetLogs {
                name: required_str(action, &mut params, "name")?,
                lines: optional_lines(action, &mut params)?,
            },
            "execute_in_container" => Self::ExecCommand {
                name: required_str(action, &mut params, "name")?,
                command: required_command(action, &mut params)?,
            },
            ACTION_NONE => Self::None,
            other => return Err(ControlError::UnknownAction(other.to_string())),
        };

        if !params.is_empty() {
            let ignored: Vec<&String> = params.keys().collect();
            tracing::debug!(action, ignored = ?ignored, "ignoring extra parameters");
        }
        Ok(decoded)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateContainer { .. } => "create_container",
            Self::DeleteContainer { .. } => "delete_container",
            Self::ModifyContainer { .. } => "modify_container",
            Self::SetGoal { .. } => "set_goal",
            Self::ListContainers => "list_containers",
            Self::GetLogs { .. } => "get_container_logs",
            Self::ExecCommand { .. } => "execute_in_container",
            Self::None => ACTION_NONE,
        }
    }
}

fn required_str(
    action: &str,
    params: &mut Map<String, Value>,
    key: &str,
) -> Result<String, ControlError> {
    match params.remove(key) {
        None | Some(Value::Null) => Err(ControlError::parameter(
            action,
            format!("missing required parameter '{}'", key),
        )),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ControlError::parameter(
            action,
            format!("parameter '{}' must not be empty", key),
        )),
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ControlError::parameter(
            action,
            format!("parameter '{}' must be a string", key),
        )),
    }
}

fn optional_lines(action: &str, params: &mut Map<String, Value>) -> Result<u32, ControlError> {
    match params.remove("lines") {
        None | Some(Value::Null) => Ok(DEFAULT_LOG_LINES),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| {
                ControlError::parameter(action, "parameter 'lines' must be a non-negative integer")
            }),
        Some(_) => Err(ControlError::parameter(
            action,
            "parameter 'lines' must be a non-negative integer",
        )),
    }
}

/// command 可为字符串（按 shell 引号规则切分）或字符串数组
fn required_command(
    action: &str,
    params: &mut Map<String, Value>,
) -> Result<Vec<String>, ControlError> {
    let argv = match params.remove("command") {
        None | Some(Value::Null) => {
            return Err(ControlError::parameter(
                action,
                "missing required parameter 'command'",
            ))
        }
        Some(Value::String(s)) => shlex::split(&s).ok_or_else(|| {
            ControlError::parameter(action, "parameter 'command' has unbalanced quotes")
        })?,
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                _ => Err(ControlError::parameter(
                    action,
                    "parameter 'command' must be a string or a list of strings",
                )),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(ControlError::parameter(
                action,
                "parameter 'command' must be a string or a list of strings",
            ))
        }
    };
    if argv.is_empty() {
        return Err(ControlError::parameter(action, "parameter 'command' must not be empty"));
    }
    Ok(argv)
}
