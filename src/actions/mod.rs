//! 动作层：封闭的动作集合、执行结果、分发器

pub mod action;
pub mod dispatcher;
pub mod result;

pub use action::{Action, ACTION_CATALOG, DEFAULT_LOG_LINES};
pub use dispatcher::ActionDispatcher;
pub use result::ActionResult;
