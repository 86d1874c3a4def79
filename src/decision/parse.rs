//! 决策解析
//!
//! 决策模型返回任意文本；从中提取 JSON（```json ... ``` 或首个 `{` 到最后一个 `}`），
//! 要求包含 thought_process / action / parameters / explanation 四个字段，否则判为 MalformedDecision。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::ControlError;

/// 「不做任何动作」的哨兵动作名，在分发前被过滤
pub const ACTION_NONE: &str = "none";

/// 决策模型每轮输出的结构化决策
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub thought_process: String,
    pub action: String,
    pub parameters: Map<String, Value>,
    pub explanation: String,
}

impl Decision {
    /// 解析失败时使用的降级决策
    pub fn fallback() -> Self {
        Self {
            thought_process: "Error in decision making".to_string(),
            action: ACTION_NONE.to_string(),
            parameters: Map::new(),
            explanation: "There was an error in processing the AI's response.".to_string(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.action == ACTION_NONE
    }
}

/// 从模型输出中截取 JSON 文本
fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        return rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim());
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// 解析模型输出：Ok 为有效决策，Err(MalformedDecision) 为无法解码或字段缺失/类型不符
pub fn parse_decision(raw: &str) -> Result<Decision, ControlError> {
    let json = extract_json(raw);
    let decision: Decision =
        serde_json::from_str(json).map_err(|e| ControlError::MalformedDecision(e.to_string()))?;

    if decision.action.trim().is_empty() {
        return Err(ControlError::MalformedDecision(
            "action must be a non-empty string".to_string(),
        ));
    }
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"thought_process": "db is exited", "action": "delete_container", "parameters": {"name": "db"}, "explanation": "Removing the stopped database."}"#;

    #[test]
    fn test_parse_plain_json() {
        let d = parse_decision(VALID).unwrap();
        assert_eq!(d.action, "delete_container");
        assert_eq!(d.parameters.get("name").and_then(Value::as_str), Some("db"));
        assert_eq!(d.explanation, "Removing the stopped database.");
    }

    #[test]
    fn test_parse_fenced_json_with_prose() {
        let raw = format!("Sure! Here is my decision:\n```json\n{}\n```\nLet me know.", VALID);
        assert_eq!(parse_decision(&raw).unwrap().action, "delete_container");
    }

    #[test]
    fn test_parse_json_embedded_in_prose() {
        let raw = format!("I think {} is best", VALID);
        assert_eq!(parse_decision(&raw).unwrap().action, "delete_container");
    }

    #[test]
    fn test_not_json_is_malformed() {
        assert!(matches!(
            parse_decision("not json"),
            Err(ControlError::MalformedDecision(_))
        ));
        assert!(matches!(parse_decision(""), Err(ControlError::MalformedDecision(_))));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let raw = r#"{"thought_process": "x", "action": "list_containers", "explanation": "y"}"#;
        match parse_decision(raw) {
            Err(ControlError::MalformedDecision(reason)) => assert!(reason.contains("parameters")),
            other => panic!("Expected MalformedDecision, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_shapes_are_malformed() {
        let action_not_string = r#"{"thought_process": "x", "action": 3, "parameters": {}, "explanation": "y"}"#;
        let params_not_map = r#"{"thought_process": "x", "action": "set_goal", "parameters": ["a"], "explanation": "y"}"#;
        let empty_action = r#"{"thought_process": "x", "action": "  ", "parameters": {}, "explanation": "y"}"#;
        for raw in [action_not_string, params_not_map, empty_action] {
            assert!(
                matches!(parse_decision(raw), Err(ControlError::MalformedDecision(_))),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_unknown_action_is_still_valid() {
        let raw = r#"{"thought_process": "x", "action": "launch_rocket", "parameters": {}, "explanation": "y"}"#;
        assert_eq!(parse_decision(raw).unwrap().action, "launch_rocket");
    }

    #[test]
    fn test_fallback_is_none_with_error_thought() {
        let d = Decision::fallback();
        assert!(d.is_none());
        assert!(d.parameters.is_empty());
        assert!(d.thought_process.contains("Error"));
    }
}
