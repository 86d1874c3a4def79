//! 动作分发器
//!
//! 将决策中的动作名解码为 Action，在超时内调用对应的单次后端操作（set_goal 则修改目标列表），
//! 并把成功/失败统一为 ActionResult；每次分发输出结构化审计日志（JSON）。分发失败是数据，不是异常。

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::actions::{Action, ActionResult};
use crate::backend::{BackendError, ContainerSummary, ResourceBackend};
use crate::core::ControlError;
use crate::memory::AgentMemory;

/// 动作分发器：持有后端、共享记忆（set_goal 用）与单次调用超时
pub struct ActionDispatcher {
    backend: Arc<dyn ResourceBackend>,
    memory: Arc<RwLock<AgentMemory>>,
    timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(
        backend: Arc<dyn ResourceBackend>,
        memory: Arc<RwLock<AgentMemory>>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            backend,
            memory,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 分发一个动作；永不返回 Err，所有失败都转为 {error: ...}
    pub async fn dispatch(&self, action: &str, parameters: Map<String, Value>) -> ActionResult {
        let start = Instant::now();
        let params_preview = params_preview(&parameters);

        let (outcome, result) = match Action::decode(action, parameters) {
            Ok(decoded) => match timeout(self.timeout, self.execute(decoded)).await {
                Ok(Ok(result)) => ("ok", result),
                Ok(Err(e)) => ("error", ActionResult::error(e.to_string())),
                Err(_) => (
                    "timeout",
                    ActionResult::error(
                        ControlError::handler(
                            action,
                            format!("timed out after {}s", self.timeout.as_secs()),
                        )
                        .to_string(),
                    ),
                ),
            },
            Err(e) => ("rejected", ActionResult::error(e.to_string())),
        };

        let audit = serde_json::json!({
            "event": "action_audit",
            "action": action,
            "ok": !result.is_error(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "params_preview": params_preview,
        });
        tracing::info!(audit = %audit.to_string(), "action");

        result
    }

    /// 每个动作恰好一次后端调用（或一次目标修改），不重试
    async fn execute(&self, action: Action) -> Result<ActionResult, ControlError> {
        let action_name = action.name();
        let failed = |e: BackendError| ControlError::handler(action_name, e.to_string());

        match action {
            Action::CreateContainer {
                name,
                image,
                options,
            } => {
                let info = self
                    .backend
                    .create_container(&name, &image, &options)
                    .await
                    .map_err(failed)?;
                Ok(ActionResult::message(format!(
                    "Container created: {} ({})",
                    info.name, info.id
                )))
            }
            Action::DeleteContainer { name } => {
                self.backend.remove_container(&name).await.map_err(failed)?;
                Ok(ActionResult::message(format!("Container deleted: {}", name)))
            }
            Action::ModifyContainer { name, options } => {
                self.backend
                    .update_container(&name, &options)
                    .await
                    .map_err(failed)?;
                Ok(ActionResult::message(format!("Container modified: {}", name)))
            }
            Action::SetGoal { goal } => {
                self.memory.write().await.goals.add_goal(goal.clone());
                Ok(ActionResult::message(format!("New goal set: {}", goal)))
            }
            Action::ListContainers => {
                let containers = self.backend.list_containers().await.map_err(failed)?;
                Ok(ActionResult::Containers {
                    containers: containers.iter().map(ContainerSummary::from).collect(),
                })
            }
            Action::GetLogs { name, lines } => {
                let bytes = self.backend.logs(&name, lines).await.map_err(failed)?;
                Ok(ActionResult::Logs {
                    logs: String::from_utf8_lossy(&bytes).into_owned(),
                })
            }
            Action::ExecCommand { name, command } => {
                let out = self.backend.exec(&name, &command).await.map_err(failed)?;
                Ok(ActionResult::Exec {
                    exit_code: out.exit_code,
                    output: String::from_utf8_lossy(&out.output).into_owned(),
                })
            }
            Action::None => Ok(ActionResult::message("No action taken")),
        }
    }
}

fn params_preview(params: &Map<String, Value>) -> String {
    let s = Value::Object(params.clone()).to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, MockBackend};
    use serde_json::json;

    fn params(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn setup(backend: MockBackend) -> (Arc<MockBackend>, Arc<RwLock<AgentMemory>>, ActionDispatcher) {
        let backend = Arc::new(backend);
        let memory = Arc::new(RwLock::new(AgentMemory::default()));
        let dispatcher = ActionDispatcher::new(backend.clone(), memory.clone(), 5);
        (backend, memory, dispatcher)
    }

    #[tokio::test]
    async fn test_unknown_action_is_data() {
        let (backend, _, dispatcher) = setup(MockBackend::new());
        let result = dispatcher.dispatch("launch_rocket", Map::new()).await;
        assert_eq!(result, ActionResult::error("Unknown action: launch_rocket"));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_none_invokes_no_handler() {
        let (backend, memory, dispatcher) = setup(MockBackend::new().with_container("abc123", "web", "running"));
        let result = dispatcher.dispatch("none", Map::new()).await;
        assert!(!result.is_error());
        assert!(backend.calls().is_empty());
        assert_eq!(backend.containers().len(), 1);
        assert!(memory.read().await.goals.is_empty());
    }

    #[tokio::test]
    async fn test_set_goal_appends_last() {
        let (_, memory, dispatcher) = setup(MockBackend::new());
        dispatcher
            .dispatch("set_goal", params(json!({"goal": "keep web up"})))
            .await;
        let result = dispatcher
            .dispatch("set_goal", params(json!({"goal": "reduce idle containers"})))
            .await;
        assert_eq!(result, ActionResult::message("New goal set: reduce idle containers"));
        let memory = memory.read().await;
        assert_eq!(
            memory.goals.list().last().map(String::as_str),
            Some("reduce idle containers")
        );
    }

    #[tokio::test]
    async fn test_parameter_error_does_not_call_backend() {
        let (backend, _, dispatcher) = setup(MockBackend::new());
        let result = dispatcher
            .dispatch("create_container", params(json!({"name": "web"})))
            .await;
        match result {
            ActionResult::Error { error } => assert!(error.contains("image")),
            other => panic!("Expected error, got {:?}", other),
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_handler_failure_is_captured() {
        let (backend, _, dispatcher) = setup(MockBackend::new());
        let result = dispatcher
            .dispatch("delete_container", params(json!({"name": "ghost"})))
            .await;
        assert_eq!(
            result,
            ActionResult::error("delete_container failed: no such container: ghost")
        );
        assert_eq!(backend.calls(), vec![BackendCall::Remove("ghost".into())]);
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (backend, _, dispatcher) = setup(MockBackend::new());
        let created = dispatcher
            .dispatch(
                "create_container",
                params(json!({"name": "web", "image": "nginx:latest", "ports": {"80/tcp": 8080}})),
            )
            .await;
        match created {
            ActionResult::Message { message } => assert!(message.starts_with("Container created: web (")),
            other => panic!("Expected message, got {:?}", other),
        }
        assert_eq!(
            backend.calls(),
            vec![BackendCall::Create {
                name: "web".into(),
                image: "nginx:latest".into()
            }]
        );

        let listed = dispatcher.dispatch("list_containers", Map::new()).await;
        match listed {
            ActionResult::Containers { containers } => {
                assert_eq!(containers.len(), 1);
                assert_eq!(containers[0].name, "web");
                assert_eq!(containers[0].status, "running");
            }
            other => panic!("Expected containers, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exec_returns_exit_code_and_output() {
        let (_, _, dispatcher) = setup(MockBackend::new().with_container("abc123", "web", "running"));
        let result = dispatcher
            .dispatch(
                "execute_in_container",
                params(json!({"name": "web", "command": "echo hello world"})),
            )
            .await;
        assert_eq!(
            result,
            ActionResult::Exec {
                exit_code: 0,
                output: "hello world\n".into()
            }
        );
    }

    #[tokio::test]
    async fn test_offline_backend_is_handler_failure() {
        let (backend, _, dispatcher) = setup(MockBackend::new());
        backend.set_available(false);
        let result = dispatcher.dispatch("list_containers", Map::new()).await;
        assert!(result.is_error());
    }
}
