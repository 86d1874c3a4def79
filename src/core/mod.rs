//! 核心层：错误分类、控制环状态、主控循环、优雅关闭

pub mod control_loop;
pub mod error;
pub mod shutdown;
pub mod state;

pub use control_loop::{ControlLoop, LoopSettings};
pub use error::ControlError;
pub use shutdown::{
    MemoryExportCleanup, ShutdownCleanup, ShutdownCoordinator, ShutdownManager, ShutdownReason,
};
pub use state::{CycleReport, LoopPhase, LoopStats, LoopStatus};
