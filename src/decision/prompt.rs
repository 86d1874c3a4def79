//! 决策提示词
//!
//! 由当前资源池快照、最近记忆与目标列表拼出发给决策模型的提示词。

use crate::actions::ACTION_CATALOG;
use crate::backend::SystemStateSnapshot;
use crate::memory::MemoryEntry;

const NO_MEMORY: &str = "No previous actions";
const NO_GOALS: &str = "No specific goals set";

/// 拼接提示词；memory 为按时间顺序的最近记忆
pub fn build_prompt(snapshot: &SystemStateSnapshot, memory: &[MemoryEntry], goals: &[String]) -> String {
    let state = serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string());
    let memory = if memory.is_empty() {
        NO_MEMORY.to_string()
    } else {
        serde_json::to_string(memory).unwrap_or_else(|_| NO_MEMORY.to_string())
    };
    let goals = if goals.is_empty() {
        NO_GOALS.to_string()
    } else {
        goals.join("\n")
    };
    let actions = ACTION_CATALOG
        .iter()
        .map(|(name, params)| format!("- {}: {}", name, params))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an autonomous AI responsible for managing a Docker container environment.
Your goal is to optimize the system, create interesting projects, and maintain a well-organized container ecosystem.

Current system state:
{state}

Recent memory:
{memory}

Current goals:
{goals}

Based on the current state, your memory, and goals, decide on the next action to take.
Be creative, but also maintain system stability and efficiency.

Available actions (name: parameters):
{actions}

Respond with a single JSON object containing:
1. "thought_process": Your reasoning for the decision
2. "action": One of the available action names
3. "parameters": An object with the parameters needed for the action
4. "explanation": A user-friendly explanation of your decision
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ContainerInfo;
    use crate::decision::Decision;

    #[test]
    fn test_empty_context_placeholders() {
        let prompt = build_prompt(&SystemStateSnapshot::default(), &[], &[]);
        assert!(prompt.contains(NO_MEMORY));
        assert!(prompt.contains(NO_GOALS));
        assert!(prompt.contains("- execute_in_container: name, command"));
        assert!(prompt.contains("\"containers\": []"));
    }

    #[test]
    fn test_prompt_includes_state_memory_and_goals() {
        let snapshot = SystemStateSnapshot {
            containers: vec![ContainerInfo {
                id: "abc123".into(),
                name: "web".into(),
                status: "running".into(),
                image: vec!["nginx:latest".into()],
            }],
            ..Default::default()
        };
        let entry = MemoryEntry::new(chrono::Utc::now(), Decision::fallback(), None);
        let goals = vec!["keep web up".to_string(), "reduce idle containers".to_string()];

        let prompt = build_prompt(&snapshot, &[entry], &goals);
        assert!(prompt.contains("\"name\": \"web\""));
        assert!(prompt.contains("Error in decision making"));
        assert!(prompt.contains("keep web up\nreduce idle containers"));
        assert!(!prompt.contains(NO_MEMORY));
    }
}
