//! 决策层：模型输出解析与提示词拼接

pub mod parse;
pub mod prompt;

pub use parse::{parse_decision, Decision, ACTION_NONE};
pub use prompt::build_prompt;
