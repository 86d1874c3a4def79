//! HTTP 展示层
//!
//! - POST /interact：按需执行一轮，返回决策与动作结果
//! - GET /system_state、/ai_goals、/ai_memory：只读视图
//! - GET /api/status、/api/health

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::actions::ActionResult;
use crate::backend::SystemStateSnapshot;
use crate::core::{ControlLoop, LoopStatus};
use crate::memory::MemoryEntry;

/// POST /interact 的返回体
#[derive(Debug, Serialize)]
struct InteractResponse {
    ai_thought_process: String,
    ai_action: String,
    ai_explanation: String,
    action_result: Option<ActionResult>,
}

#[derive(Debug, Serialize)]
struct GoalsResponse {
    goals: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MemoryResponse {
    memory: Vec<MemoryEntry>,
}

pub fn router(control: Arc<ControlLoop>) -> Router {
    Router::new()
        .route("/interact", post(interact))
        .route("/system_state", get(system_state))
        .route("/ai_goals", get(ai_goals))
        .route("/ai_memory", get(ai_memory))
        .route("/api/status", get(api_status))
        .route("/api/health", get(|| async { "OK" }))
        .with_state(control)
}

async fn interact(
    State(control): State<Arc<ControlLoop>>,
) -> Result<Json<InteractResponse>, (StatusCode, String)> {
    let report = control
        .run_cycle()
        .await
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))?;
    Ok(Json(InteractResponse {
        ai_thought_process: report.decision.thought_process,
        ai_action: report.decision.action,
        ai_explanation: report.decision.explanation,
        action_result: report.result,
    }))
}

async fn system_state(
    State(control): State<Arc<ControlLoop>>,
) -> Result<Json<SystemStateSnapshot>, (StatusCode, String)> {
    control
        .system_state()
        .await
        .map(Json)
        .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, e.to_string()))
}

async fn ai_goals(State(control): State<Arc<ControlLoop>>) -> impl IntoResponse {
    Json(GoalsResponse {
        goals: control.goals().await,
    })
}

async fn ai_memory(State(control): State<Arc<ControlLoop>>) -> impl IntoResponse {
    Json(MemoryResponse {
        memory: control.memory_entries().await,
    })
}

async fn api_status(State(control): State<Arc<ControlLoop>>) -> Json<LoopStatus> {
    Json(control.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    use crate::actions::ActionDispatcher;
    use crate::backend::{MockBackend, StateSnapshotter};
    use crate::core::LoopSettings;
    use crate::llm::MockOracle;
    use crate::memory::AgentMemory;

    fn app(backend: Arc<MockBackend>, oracle: MockOracle) -> Router {
        let memory = Arc::new(RwLock::new(AgentMemory::default()));
        let control = ControlLoop::new(
            StateSnapshotter::new(backend.clone()),
            Arc::new(oracle),
            ActionDispatcher::new(backend, memory.clone(), 5),
            memory,
            LoopSettings::default(),
        );
        router(Arc::new(control))
    }

    async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    #[tokio::test]
    async fn test_interact_runs_one_cycle() {
        let backend = Arc::new(MockBackend::new());
        let oracle = MockOracle::new().reply(
            r#"{"thought_process": "need a goal", "action": "set_goal", "parameters": {"goal": "keep web up"}, "explanation": "bootstrap"}"#,
        );
        let app = app(backend, oracle);

        let (status, body) = call(&app, "POST", "/interact").await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({
                "ai_thought_process": "need a goal",
                "ai_action": "set_goal",
                "ai_explanation": "bootstrap",
                "action_result": {"message": "New goal set: keep web up"}
            })
        );

        let (_, goals) = call(&app, "GET", "/ai_goals").await;
        let goals: Value = serde_json::from_slice(&goals).unwrap();
        assert_eq!(goals, json!({"goals": ["keep web up"]}));

        let (_, memory) = call(&app, "GET", "/ai_memory").await;
        let memory: Value = serde_json::from_slice(&memory).unwrap();
        assert_eq!(memory["memory"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_backend_down_is_service_unavailable() {
        let backend = Arc::new(MockBackend::new());
        backend.set_available(false);
        let app = app(backend, MockOracle::new());

        let (status, _) = call(&app, "GET", "/system_state").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, _) = call(&app, "POST", "/interact").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let (status, body) = call(&app, "GET", "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["failed_cycles"], 1);
        assert_eq!(body["phase"], "idle");
    }

    #[tokio::test]
    async fn test_system_state_and_health() {
        let backend = Arc::new(
            MockBackend::new()
                .with_container("abc123", "web", "running")
                .with_network("bridge"),
        );
        let app = app(backend, MockOracle::new());

        let (status, body) = call(&app, "GET", "/system_state").await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["containers"][0]["name"], "web");
        assert_eq!(body["networks"], json!(["bridge"]));

        let (status, body) = call(&app, "GET", "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }
}
